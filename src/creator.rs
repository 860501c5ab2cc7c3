use anyhow::Result;
use tracing::{info, warn};

use crate::anki::AnkiClient;
use crate::config::Config;
use crate::error::{AppError, ValidationError};
use crate::lookup::LookupClient;
use crate::mapper::{self, CardContent};
use crate::models::*;

pub const SOURCE_LANGUAGE: &str = "en";
pub const TARGET_LANGUAGE: &str = "ja";

const MANUAL_DEFAULT_DECK: &str = "Default";

/// 含空白即为短语，否则为单词。只看字面，不查词典
pub fn classify_input(text: &str) -> InputMode {
    if text.chars().any(char::is_whitespace) || text.split_whitespace().count() > 1 {
        InputMode::Phrase
    } else {
        InputMode::Word
    }
}

// 关键词图片搜索对整句效果差，短语只用第一个词
fn image_query(text: &str, mode: InputMode) -> &str {
    match mode {
        InputMode::Word => text,
        InputMode::Phrase => text.split_whitespace().next().unwrap_or(text),
    }
}

// 回执里要回显的查询内容；查询失败直接报错
fn submission_echo(text: &str, mode: InputMode, content: &LookupResult) -> Result<SubmissionOutcome, AppError> {
    let outcome = SubmissionOutcome {
        mode,
        word: None,
        definition: None,
        original_text: None,
        translated_text: None,
        image_url: None,
        anki_note_id: 0,
    };
    match content {
        LookupResult::WordDefinition(definition) => Ok(SubmissionOutcome {
            word: Some(text.to_string()),
            definition: Some(definition.clone()),
            ..outcome
        }),
        LookupResult::PhraseTranslation { original, translated } => Ok(SubmissionOutcome {
            original_text: Some(original.clone()),
            translated_text: Some(translated.clone()),
            ..outcome
        }),
        LookupResult::Failure(reason) => Err(AppError::UpstreamUnavailable(reason.clone())),
    }
}

pub struct AnkiCreator {
    lookup: LookupClient,
    anki: AnkiClient,
}

impl AnkiCreator {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(AnkiCreator {
            lookup: LookupClient::new(config)?,
            anki: AnkiClient::new(config)?,
        })
    }

    pub fn lookup(&self) -> &LookupClient {
        &self.lookup
    }

    pub fn anki(&self) -> &AnkiClient {
        &self.anki
    }

    // 第一步：查词典或翻译，失败则整个提交失败
    async fn fetch_content(
        &self,
        text: &str,
        mode: InputMode,
        source: DictionarySource,
    ) -> Result<LookupResult, AppError> {
        match (mode, source) {
            (InputMode::Word, DictionarySource::FreeDictionary) => {
                let entry = self
                    .lookup
                    .lookup_word(text)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| AppError::NotFound("Word not found".to_string()))?;
                Ok(LookupResult::WordDefinition(entry))
            }
            (InputMode::Word, DictionarySource::Cambridge) => {
                let definition = self.lookup.lookup_cambridge(text).await?;
                Ok(LookupResult::WordDefinition(WordDefinition {
                    word: text.to_string(),
                    phonetic: None,
                    meanings: vec![Meaning {
                        part_of_speech: "definition".to_string(),
                        definitions: vec![Definition {
                            definition,
                            example: None,
                        }],
                    }],
                }))
            }
            (InputMode::Phrase, _) => {
                let translated = self
                    .lookup
                    .translate(text, SOURCE_LANGUAGE, TARGET_LANGUAGE)
                    .await?;
                Ok(LookupResult::PhraseTranslation {
                    original: text.to_string(),
                    translated,
                })
            }
        }
    }

    // 第二步：图片只是装饰，失败就不带图片继续
    async fn fetch_image(&self, text: &str, mode: InputMode) -> Option<ImageReference> {
        match self.lookup.search_image(image_query(text, mode)).await {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("图片获取失败，不带图片继续: {}", e);
                None
            }
        }
    }

    /// 自动提交：查询 → 图片 → 笔记类型 → 媒体 → 字段映射 → 添加笔记
    pub async fn process(&self, text: &str, settings: &Settings) -> Result<SubmissionOutcome, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }
        let deck_name = settings.deck_name.trim();
        if deck_name.is_empty() {
            return Err(ValidationError::EmptyDeckName.into());
        }

        let mode = classify_input(text);
        info!("🔄 开始处理 {:?}: {}", mode, text);

        let content = self.fetch_content(text, mode, settings.dictionary_source).await?;
        // 查询失败时不能碰 AnkiConnect
        let mut outcome = submission_echo(text, mode, &content)?;
        let image = self.fetch_image(text, mode).await;

        let schema = self.anki.discover_schema().await?;
        let media_file = match &image {
            Some(image) => self.anki.store_image(image, text).await,
            None => None,
        };

        let card = CardContent {
            text,
            lookup: &content,
            media_file: media_file.as_deref(),
            filter_meanings: settings.dictionary_source == DictionarySource::FreeDictionary,
        };
        let fields = mapper::map_fields(&schema, &card)?;

        let note_id = self
            .anki
            .add_note(deck_name, &schema.model_name, &fields, self.anki.auto_tags())
            .await?;

        // 只回显真正放进卡片的图片
        outcome.image_url = media_file.and(image).map(|i| i.url);
        outcome.anki_note_id = note_id;

        info!("🎉 已添加到 Anki: {} (note {})", text, note_id);
        Ok(outcome)
    }

    /// 手动提交：单词和意思由用户填写，可附带上传图片或图片 URL
    pub async fn submit_manual(&self, submission: &ManualSubmission) -> Result<ManualOutcome, AppError> {
        let word = submission.word.as_deref().map(str::trim).unwrap_or("");
        let meaning = submission.meaning.as_deref().map(str::trim).unwrap_or("");
        if word.is_empty() || meaning.is_empty() {
            return Err(ValidationError::MissingWordOrMeaning.into());
        }

        // 上传的文件没有内容时改用图片 URL
        let uploaded = submission.image_file.as_ref().filter(|f| !f.data.trim().is_empty());
        let image_html = if let Some(file) = uploaded {
            match self.anki.store_media_file(&file.filename, &file.data).await {
                Ok(_) => {
                    info!("🖼️  图片已保存: {}", file.filename);
                    Some(mapper::image_markup(&file.filename))
                }
                Err(e) => {
                    warn!("图片保存失败: {}", e);
                    None
                }
            }
        } else {
            submission
                .image_url_input
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(mapper::image_markup)
        };

        let schema = self.anki.discover_schema().await?;
        let fields = mapper::map_manual_fields(&schema, word, meaning, image_html.as_deref())?;

        let deck_name = submission
            .deck_name
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(MANUAL_DEFAULT_DECK);
        let note_id = self
            .anki
            .add_note(deck_name, &schema.model_name, &fields, self.anki.manual_tags())
            .await?;

        Ok(ManualOutcome {
            note_id,
            image_added: image_html.is_some(),
        })
    }
}
