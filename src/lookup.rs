use anyhow::Result;
use regex::Regex;
use reqwest::{Client, ClientBuilder, StatusCode, Url};
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{Config, LookupConfig};
use crate::error::{LookupError, ValidationError};
use crate::models::{ImageReference, ImageSource, WordDefinition};

pub const SUPPORTED_LANGUAGES: [&str; 2] = ["en", "ja"];

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

static CAMBRIDGE_DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<div class="def ddef_d db">(.*?)</div>"#).expect("valid regex"));
static HTML_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<a[^>]*>(.*?)</a>").expect("valid regex"));
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

// MyMemory 翻译 API 响应结构
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslationResponse {
    response_data: Option<TranslationData>,
    response_status: serde_json::Value,
    response_details: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslationData {
    translated_text: String,
}

// Unsplash 搜索响应结构
#[derive(Debug, Deserialize)]
struct UnsplashSearch {
    results: Vec<UnsplashPhoto>,
}

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    urls: UnsplashUrls,
}

#[derive(Debug, Deserialize)]
struct UnsplashUrls {
    small: String,
}

/// 词典、翻译、图片搜索的外部接口
pub struct LookupClient {
    client: Client,
    config: LookupConfig,
}

impl LookupClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.processing.request_timeout_seconds))
            .build()?;

        Ok(LookupClient {
            client,
            config: config.lookup.clone(),
        })
    }

    // 把单词作为路径段拼到基础 URL 后面（自动转义）
    fn entry_url(base: &str, word: &str) -> Result<Url, LookupError> {
        let mut url = Url::parse(base).map_err(|e| LookupError::Upstream(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| LookupError::Upstream(format!("invalid base url: {}", base)))?
            .pop_if_empty()
            .push(word);
        Ok(url)
    }

    /// 免费词典 API 查询单词
    pub async fn lookup_word(&self, word: &str) -> Result<Vec<WordDefinition>, LookupError> {
        let word = word.trim();
        if word.is_empty() {
            return Err(ValidationError::MissingParameter("Word").into());
        }

        let url = Self::entry_url(&self.config.dictionary_url, word)?;
        debug!("查询词典: {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound("Word not found".to_string()));
        }
        if !status.is_success() {
            return Err(LookupError::Upstream(format!(
                "Dictionary API error: {}",
                status.as_u16()
            )));
        }

        let entries: Vec<WordDefinition> = response
            .json()
            .await
            .map_err(|e| LookupError::Upstream(format!("词典响应解析失败: {}", e)))?;
        if entries.is_empty() {
            return Err(LookupError::NotFound("Word not found".to_string()));
        }

        info!("📖 词典找到 {} 个条目: {}", entries.len(), word);
        Ok(entries)
    }

    /// 从剑桥词典网页抓取第一条释义
    pub async fn lookup_cambridge(&self, word: &str) -> Result<String, LookupError> {
        let word = word.trim();
        if word.is_empty() {
            return Err(ValidationError::MissingParameter("Word").into());
        }

        let url = Self::entry_url(&self.config.cambridge_url, word)?;
        debug!("查询剑桥词典: {}", url);
        let response = self
            .client
            .get(url)
            .header("User-Agent", BROWSER_USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LookupError::NotFound("Definition not found".to_string()));
        }

        let html = response.text().await?;
        extract_cambridge_definition(&html)
            .ok_or_else(|| LookupError::NotFound("Definition not found".to_string()))
    }

    /// MyMemory 翻译，只支持英日互译
    pub async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, LookupError> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }
        if !SUPPORTED_LANGUAGES.contains(&from) || !SUPPORTED_LANGUAGES.contains(&to) {
            return Err(ValidationError::UnsupportedLanguagePair.into());
        }

        let langpair = format!("{}|{}", from, to);
        let response = self
            .client
            .get(&self.config.translation_url)
            .query(&[("q", text), ("langpair", langpair.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LookupError::Upstream(format!(
                "Translation API error: {}",
                response.status().as_u16()
            )));
        }

        let data: TranslationResponse = response
            .json()
            .await
            .map_err(|e| LookupError::Upstream(format!("翻译响应解析失败: {}", e)))?;

        // responseStatus 有时是数字，有时是字符串
        let ok = match &data.response_status {
            serde_json::Value::Number(n) => n.as_u64() == Some(200),
            serde_json::Value::String(s) => s == "200",
            _ => false,
        };
        match (ok, data.response_data) {
            (true, Some(payload)) => {
                info!("🌐 翻译完成: {} -> {}", text, payload.translated_text);
                Ok(payload.translated_text)
            }
            _ => Err(LookupError::Upstream(format!(
                "Translation failed: {}",
                data.response_details.unwrap_or_else(|| "Unknown error".to_string())
            ))),
        }
    }

    /// Unsplash 搜索图片；没有密钥、出错或没有结果时返回占位图
    pub async fn search_image(&self, query: &str) -> Result<ImageReference, LookupError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ValidationError::MissingParameter("Query").into());
        }

        match self.config.unsplash_access_key.as_deref() {
            Some(key) if key.len() > 10 => match self.search_unsplash(query, key).await {
                Ok(Some(url)) => {
                    info!("🖼️  Unsplash 找到图片: {}", query);
                    return Ok(ImageReference {
                        url,
                        source: ImageSource::PrimarySource,
                    });
                }
                Ok(None) => info!("Unsplash 没有结果: {}", query),
                Err(e) => warn!("Unsplash 请求失败: {}", e),
            },
            _ => debug!("未配置 Unsplash 密钥，使用占位图"),
        }

        Ok(self.placeholder_image())
    }

    async fn search_unsplash(&self, query: &str, key: &str) -> Result<Option<String>, LookupError> {
        let url = format!("{}/search/photos", self.config.unsplash_url.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .header("Accept-Version", "v1")
            .query(&[("query", query), ("per_page", "1"), ("client_id", key)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Upstream(format!("{}: {}", status.as_u16(), body)));
        }

        let search: UnsplashSearch = response
            .json()
            .await
            .map_err(|e| LookupError::Upstream(e.to_string()))?;
        Ok(search.results.into_iter().next().map(|p| p.urls.small))
    }

    pub fn placeholder_image(&self) -> ImageReference {
        ImageReference {
            url: format!(
                "{}?random={}",
                self.config.placeholder_url,
                chrono::Utc::now().timestamp_millis()
            ),
            source: ImageSource::FallbackPlaceholder,
        }
    }
}

/// 剑桥词典页面里第一条释义，去掉标签并压缩空白
pub fn extract_cambridge_definition(html: &str) -> Option<String> {
    let raw = CAMBRIDGE_DEFINITION.captures(html)?.get(1)?.as_str();
    let unlinked = HTML_LINK.replace_all(raw, "$1");
    let plain = HTML_TAG.replace_all(&unlinked, "");
    let definition = WHITESPACE.replace_all(&plain, " ").trim().to_string();
    if definition.is_empty() {
        None
    } else {
        Some(definition)
    }
}
