use serde::{Deserialize, Serialize};

// 免费词典 API 返回的条目结构
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WordDefinition {
    pub word: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
    #[serde(default)]
    pub meanings: Vec<Meaning>,
}

// 词性是开放字符串，上游返回什么都接受
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meaning {
    pub part_of_speech: String,
    #[serde(default)]
    pub definitions: Vec<Definition>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Definition {
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

impl Meaning {
    /// 第一条释义，卡片上只展示这一条
    pub fn primary(&self) -> Option<&Definition> {
        self.definitions.first()
    }
}

/// 查询结果，创建后不可变，只交给字段映射使用
#[derive(Debug, Clone, PartialEq)]
pub enum LookupResult {
    WordDefinition(WordDefinition),
    PhraseTranslation { original: String, translated: String },
    Failure(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    #[serde(rename = "unsplash")]
    PrimarySource,
    #[serde(rename = "placeholder")]
    FallbackPlaceholder,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageReference {
    #[serde(rename = "imageUrl")]
    pub url: String,
    pub source: ImageSource,
}

impl ImageReference {
    // URL 中含 .jpg / .jpeg 视为 jpg，其余一律 png
    pub fn extension(&self) -> &'static str {
        if self.url.contains(".jpg") || self.url.contains(".jpeg") {
            "jpg"
        } else {
            "png"
        }
    }
}

/// 笔记类型的字段列表，每次提交都重新获取
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSchema {
    pub model_name: String,
    pub fields: Vec<String>,
}

impl NoteSchema {
    pub fn new(model_name: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            model_name: model_name.into(),
            fields,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// 字段名 -> 内容。键必须来自对应的 NoteSchema，且不重复
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldAssignment {
    entries: Vec<(String, String)>,
}

impl FieldAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同名字段再次赋值时覆盖原值，不会产生第二个键
    pub fn assign(&mut self, field: &str, content: impl Into<String>) {
        let content = content.into();
        match self.entries.iter_mut().find(|(name, _)| name == field) {
            Some(entry) => entry.1 = content,
            None => self.entries.push((field.to_string(), content)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, content)| content.as_str())
    }

    pub fn append(&mut self, field: &str, suffix: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(name, _)| name == field) {
            entry.1.push_str(suffix);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.entries
            .iter()
            .map(|(name, content)| (name.clone(), serde_json::Value::String(content.clone())))
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DictionarySource {
    #[default]
    FreeDictionary,
    Cambridge,
}

impl DictionarySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DictionarySource::FreeDictionary => "free-dictionary",
            DictionarySource::Cambridge => "cambridge",
        }
    }
}

impl std::str::FromStr for DictionarySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "free-dictionary" => Ok(DictionarySource::FreeDictionary),
            "cambridge" => Ok(DictionarySource::Cambridge),
            other => Err(format!("unknown dictionary source: {}", other)),
        }
    }
}

pub const DEFAULT_DECK_NAME: &str = "English Vocabulary";

/// 用户设置。每次提交前复制一份快照，提交过程中不再读取
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub deck_name: String,
    #[serde(default)]
    pub dictionary_source: DictionarySource,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            deck_name: DEFAULT_DECK_NAME.to_string(),
            dictionary_source: DictionarySource::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    Word,
    Phrase,
}

/// 自动提交成功后的回执
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    #[serde(rename = "type")]
    pub mode: InputMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<WordDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    pub image_url: Option<String>,
    pub anki_note_id: i64,
}

/// 手动提交时上传的图片（base64）
#[derive(Debug, Deserialize, Clone)]
pub struct UploadedImage {
    pub filename: String,
    pub data: String,
}

/// 手动提交：单词和意思由用户填写
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ManualSubmission {
    pub word: Option<String>,
    pub meaning: Option<String>,
    pub image_file: Option<UploadedImage>,
    pub image_url_input: Option<String>,
    pub deck_name: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManualOutcome {
    pub note_id: i64,
    pub image_added: bool,
}
