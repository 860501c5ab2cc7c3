use anyhow::Result;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::path::Path;
use tracing::info;

use crate::models::{DictionarySource, Settings};

const KEY_DECK_NAME: &str = "deck_name";
const KEY_DICTIONARY_SOURCE: &str = "dictionary_source";

/// 本地设置存储（SQLite 键值表）
#[derive(Clone)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        info!("💾 连接数据库: {}", db_path.display());

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let manager = DatabaseManager { pool };
        manager.initialize_tables().await?;
        Ok(manager)
    }

    async fn initialize_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.0))
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// 读取设置，缺少的项用默认值补齐
    pub async fn load_settings(&self) -> Result<Settings> {
        let mut settings = Settings::default();

        if let Some(deck) = self.get_value(KEY_DECK_NAME).await? {
            if !deck.trim().is_empty() {
                settings.deck_name = deck;
            }
        }

        if let Some(source) = self.get_value(KEY_DICTIONARY_SOURCE).await? {
            match source.parse::<DictionarySource>() {
                Ok(source) => settings.dictionary_source = source,
                Err(e) => tracing::warn!("忽略无效的词典来源设置: {}", e),
            }
        }

        Ok(settings)
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        if settings.deck_name.trim().is_empty() {
            anyhow::bail!("牌组名称不能为空");
        }

        self.set_value(KEY_DECK_NAME, settings.deck_name.trim()).await?;
        self.set_value(KEY_DICTIONARY_SOURCE, settings.dictionary_source.as_str())
            .await?;
        info!(
            "💾 设置已保存: 牌组 {}，词典 {}",
            settings.deck_name.trim(),
            settings.dictionary_source.as_str()
        );
        Ok(())
    }
}
