use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{AnkiConfig, Config};
use crate::error::AnkiError;
use crate::models::{FieldAssignment, ImageReference, NoteSchema};

// AnkiConnect 统一请求信封
#[derive(Debug, Serialize)]
struct AnkiRequest<'a> {
    action: &'a str,
    version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct AnkiResponse<T> {
    pub result: Option<T>,
    pub error: Option<String>,
}

const DEFAULT_FIELDS: [&str; 2] = ["Front", "Back"];

/// 本地 AnkiConnect 客户端
pub struct AnkiClient {
    client: Client,
    config: AnkiConfig,
}

impl AnkiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.processing.request_timeout_seconds))
            .build()?;

        Ok(AnkiClient {
            client,
            config: config.anki.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    async fn invoke<T: DeserializeOwned>(
        &self,
        action: &str,
        params: Option<serde_json::Value>,
    ) -> Result<Option<T>, AnkiError> {
        let request = AnkiRequest {
            action,
            version: self.config.api_version,
            params,
        };
        debug!("AnkiConnect 请求: {}", action);

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AnkiError::OtherApi(format!(
                "HTTP {}: {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("")
            )));
        }

        let body: AnkiResponse<T> = response
            .json()
            .await
            .map_err(|e| AnkiError::OtherApi(format!("响应解析失败: {}", e)))?;

        match body.error {
            Some(error) => Err(AnkiError::classify(&error)),
            None => Ok(body.result),
        }
    }

    // 用来检查 AnkiConnect 是否在线
    pub async fn version(&self) -> Result<u32, AnkiError> {
        Ok(self.invoke::<u32>("version", None).await?.unwrap_or_default())
    }

    pub async fn deck_names(&self) -> Result<Vec<String>, AnkiError> {
        Ok(self.invoke("deckNames", None).await?.unwrap_or_default())
    }

    pub async fn model_names(&self) -> Result<Vec<String>, AnkiError> {
        Ok(self.invoke("modelNames", None).await?.unwrap_or_default())
    }

    pub async fn model_field_names(&self, model_name: &str) -> Result<Vec<String>, AnkiError> {
        let params = json!({ "modelName": model_name });
        match self.invoke::<Vec<String>>("modelFieldNames", Some(params)).await {
            Ok(Some(fields)) => Ok(fields),
            Ok(None) => Ok(default_fields()),
            Err(AnkiError::ConnectionFailure(e)) => Err(AnkiError::ConnectionFailure(e)),
            Err(e) => {
                warn!("获取字段失败，使用默认字段: {}", e);
                Ok(default_fields())
            }
        }
    }

    /// 取第一个笔记类型及其字段，每次提交都重新获取
    pub async fn discover_schema(&self) -> Result<NoteSchema, AnkiError> {
        let models = self.model_names().await?;
        let model_name = models.into_iter().next().ok_or(AnkiError::NoNotetypes)?;
        info!("使用笔记类型: {}", model_name);

        let fields = self.model_field_names(&model_name).await?;
        debug!("可用字段: {:?}", fields);
        Ok(NoteSchema::new(model_name, fields))
    }

    pub async fn store_media_file(&self, filename: &str, data: &str) -> Result<String, AnkiError> {
        let params = json!({ "filename": filename, "data": data });
        let stored: Option<String> = self.invoke("storeMediaFile", Some(params)).await?;
        Ok(stored.unwrap_or_else(|| filename.to_string()))
    }

    /// 下载图片并存入 Anki 媒体库；任何一步失败都返回 None，提交继续
    pub async fn store_image(&self, image: &ImageReference, text: &str) -> Option<String> {
        let filename = media_filename(text, chrono::Utc::now().timestamp_millis(), image.extension());

        let bytes = match self.download(&image.url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("图片下载失败，不带图片继续: {}", e);
                return None;
            }
        };

        match self.store_media_file(&filename, &BASE64.encode(&bytes)).await {
            Ok(_) => {
                info!("🖼️  图片已保存: {}", filename);
                Some(filename)
            }
            Err(e) => {
                warn!("图片保存失败，不带图片继续: {}", e);
                None
            }
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn add_note(
        &self,
        deck_name: &str,
        model_name: &str,
        fields: &FieldAssignment,
        tags: &[String],
    ) -> Result<i64, AnkiError> {
        let params = json!({
            "note": {
                "deckName": deck_name,
                "modelName": model_name,
                "fields": fields.to_json(),
                "tags": tags,
            }
        });

        let note_id: Option<i64> = self.invoke("addNote", Some(params)).await?;
        let note_id =
            note_id.ok_or_else(|| AnkiError::OtherApi("addNote returned no note id".to_string()))?;
        info!("✅ 已添加笔记 {} 到牌组 {}", note_id, deck_name);
        Ok(note_id)
    }

    pub fn auto_tags(&self) -> &[String] {
        &self.config.auto_tags
    }

    pub fn manual_tags(&self) -> &[String] {
        &self.config.manual_tags
    }
}

fn default_fields() -> Vec<String> {
    DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect()
}

/// 媒体文件名：原文（空白换成下划线）+ 时间戳 + 扩展名
pub fn media_filename(text: &str, timestamp_ms: i64, extension: &str) -> String {
    let stem = text.split_whitespace().collect::<Vec<_>>().join("_");
    format!("{}_{}.{}", stem, timestamp_ms, extension)
}
