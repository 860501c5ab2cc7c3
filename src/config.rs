use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

// 配置文件结构
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub anki: AnkiConfig,
    pub lookup: LookupConfig,
    pub processing: ProcessingConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnkiConfig {
    pub endpoint: String,
    pub api_version: u32,
    pub auto_tags: Vec<String>,
    pub manual_tags: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LookupConfig {
    pub dictionary_url: String,
    pub cambridge_url: String,
    pub translation_url: String,
    pub unsplash_url: String,
    pub placeholder_url: String,
    pub unsplash_access_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProcessingConfig {
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub db_file: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Default for AnkiConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8765".to_string(),
            api_version: 6,
            auto_tags: vec![
                "vocabulary".to_string(),
                "english".to_string(),
                "auto-generated".to_string(),
            ],
            manual_tags: vec![
                "vocabulary".to_string(),
                "manual".to_string(),
                "anki-pocket".to_string(),
            ],
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            dictionary_url: "https://api.dictionaryapi.dev/api/v2/entries/en".to_string(),
            cambridge_url: "https://dictionary.cambridge.org/ja/dictionary/english".to_string(),
            translation_url: "https://api.mymemory.translated.net/get".to_string(),
            unsplash_url: "https://api.unsplash.com".to_string(),
            placeholder_url: "https://picsum.photos/300/200".to_string(),
            unsplash_access_key: None,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 30,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_file: "anki_pocket.db".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Config> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// 读取配置文件；文件不存在时使用默认配置，格式错误时报错
    pub fn load_from(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let config_content = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("配置文件 {} 无法读取: {}", path.display(), e))?;
            Self::parse(&config_content)?
        } else {
            tracing::info!("配置文件 {} 不存在，使用默认配置", path.display());
            Config::default()
        };

        // 环境变量优先于配置文件
        if let Ok(key) = std::env::var("UNSPLASH_ACCESS_KEY") {
            if !key.trim().is_empty() {
                config.lookup.unsplash_access_key = Some(key);
            }
        }

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("配置文件解析失败: {}", e))?;
        Ok(config)
    }
}
