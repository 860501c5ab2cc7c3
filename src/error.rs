// 错误分类
// 校验错误、上游查无结果、上游不可用、AnkiConnect 错误四类，全部不重试。

use thiserror::Error;

/// 输入校验错误，直接返回给调用方
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Text parameter is required")]
    EmptyInput,

    #[error("DeckName parameter is required")]
    EmptyDeckName,

    #[error("{0} parameter is required")]
    MissingParameter(&'static str),

    #[error("Word and meaning are required")]
    MissingWordOrMeaning,

    #[error("Unsupported language pair")]
    UnsupportedLanguagePair,

    #[error("Note type has no fields")]
    InvalidSchema,
}

/// 外部查询客户端的错误
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream unavailable: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        LookupError::Upstream(e.to_string())
    }
}

/// AnkiConnect 错误。AnkiConnect 没有错误码，只能按错误文本归类
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnkiError {
    #[error("Cannot connect to AnkiConnect: {0}")]
    ConnectionFailure(String),

    #[error("Duplicate note: {0}")]
    DuplicateNote(String),

    #[error("Deck not found: {0}")]
    DeckNotFound(String),

    #[error("Note type not found: {0}")]
    NotetypeNotFound(String),

    #[error("No available note types found")]
    NoNotetypes,

    #[error("AnkiConnect error: {0}")]
    OtherApi(String),
}

impl AnkiError {
    /// 按 AnkiConnect 返回的错误文本归类（不区分大小写）
    pub fn classify(message: &str) -> AnkiError {
        let lowered = message.to_lowercase();
        if lowered.contains("duplicate") {
            AnkiError::DuplicateNote(message.to_string())
        } else if lowered.contains("deck was not found") {
            AnkiError::DeckNotFound(message.to_string())
        } else if lowered.contains("model was not found") {
            AnkiError::NotetypeNotFound(message.to_string())
        } else {
            AnkiError::OtherApi(message.to_string())
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            AnkiError::ConnectionFailure(_) => "connection",
            AnkiError::DuplicateNote(_) => "duplicate",
            AnkiError::DeckNotFound(_) => "deck-not-found",
            AnkiError::NotetypeNotFound(_) => "notetype-not-found",
            AnkiError::NoNotetypes => "no-notetypes",
            AnkiError::OtherApi(_) => "anki-api",
        }
    }

    /// 给用户的处理建议
    pub fn remediation(&self) -> &'static str {
        match self {
            AnkiError::ConnectionFailure(_) => {
                "Start Anki and make sure the AnkiConnect add-on is installed and enabled"
            }
            AnkiError::DuplicateNote(_) => "This card already exists in the deck",
            AnkiError::DeckNotFound(_) => "Check the deck name in the settings",
            AnkiError::NotetypeNotFound(_) | AnkiError::NoNotetypes => {
                "Create a note type in Anki before adding cards"
            }
            AnkiError::OtherApi(_) => "Check the AnkiConnect configuration",
        }
    }
}

impl From<reqwest::Error> for AnkiError {
    fn from(e: reqwest::Error) -> Self {
        AnkiError::ConnectionFailure(e.to_string())
    }
}

/// 编排层统一错误
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    UpstreamUnavailable(String),

    #[error("{0}")]
    Automation(#[from] AnkiError),
}

impl From<LookupError> for AppError {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::Validation(v) => AppError::Validation(v),
            LookupError::NotFound(msg) => AppError::NotFound(msg),
            LookupError::Upstream(msg) => AppError::UpstreamUnavailable(msg),
        }
    }
}

impl AppError {
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not-found",
            AppError::UpstreamUnavailable(_) => "upstream-unavailable",
            AppError::Automation(e) => e.category(),
        }
    }
}
