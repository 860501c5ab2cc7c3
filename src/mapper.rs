// 字段映射
// 笔记类型的字段名因用户而异。先按别名表找“正面/意思/图片/词源”字段，
// 都找不到正面和意思时，退回到按字段顺序填充。

use crate::error::ValidationError;
use crate::models::{FieldAssignment, LookupResult, Meaning, NoteSchema, WordDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Head,
    Meaning,
    Image,
    Etymology,
}

// 别名按优先级排列：英文默认笔记类型在前，日文在后
const FIELD_ALIASES: &[(Slot, &[&str])] = &[
    (Slot::Head, &["Sentence", "センテンス"]),
    (Slot::Meaning, &["Japanese Meaning", "日本語の意味"]),
    (Slot::Image, &["Image", "画像"]),
    (Slot::Etymology, &["Etymology", "語源"]),
];

pub const COMMON_PARTS_OF_SPEECH: [&str; 7] = [
    "noun",
    "adjective",
    "adverb",
    "pronoun",
    "preposition",
    "conjunction",
    "interjection",
];

const VERB_MIN_DEFINITION_CHARS: usize = 30;
const VERB_EXCLUDED_PHRASES: [&str; 2] = ["to become", "to form"];

/// 在笔记类型中找到某个槽位对应的字段名
pub fn resolve_slot(schema: &NoteSchema, slot: Slot) -> Option<&'static str> {
    FIELD_ALIASES
        .iter()
        .filter(|(s, _)| *s == slot)
        .flat_map(|(_, aliases)| aliases.iter())
        .find(|alias| schema.contains(alias))
        .copied()
}

/// 过滤掉生僻的动词义项，只保留常见词性
pub fn filter_meanings(meanings: &[Meaning]) -> Vec<&Meaning> {
    meanings.iter().filter(|m| is_presentable(m)).collect()
}

fn is_presentable(meaning: &Meaning) -> bool {
    let pos = meaning.part_of_speech.to_lowercase();
    if COMMON_PARTS_OF_SPEECH.contains(&pos.as_str()) {
        return true;
    }
    if pos != "verb" {
        return false;
    }
    meaning.definitions.iter().any(|d| {
        let text = d.definition.to_lowercase();
        d.definition.chars().count() > VERB_MIN_DEFINITION_CHARS
            && !VERB_EXCLUDED_PHRASES.iter().any(|p| text.contains(p))
    })
}

/// 字段映射的输入
#[derive(Debug, Clone, Copy)]
pub struct CardContent<'a> {
    /// 用户输入的原文（已去除首尾空白）
    pub text: &'a str,
    pub lookup: &'a LookupResult,
    /// 已存入 Anki 媒体库的图片文件名
    pub media_file: Option<&'a str>,
    /// 只有免费词典的结果才做词性过滤
    pub filter_meanings: bool,
}

impl CardContent<'_> {
    fn meanings(&self) -> Vec<&Meaning> {
        match self.lookup {
            LookupResult::WordDefinition(def) if self.filter_meanings => {
                filter_meanings(&def.meanings)
            }
            LookupResult::WordDefinition(def) => def.meanings.iter().collect(),
            _ => Vec::new(),
        }
    }

    fn head(&self) -> String {
        match self.lookup {
            LookupResult::WordDefinition(def) => head_with_phonetic(self.text, def),
            LookupResult::PhraseTranslation { original, .. } => original.clone(),
            LookupResult::Failure(_) => self.text.to_string(),
        }
    }

    fn meaning_lines(&self) -> String {
        match self.lookup {
            LookupResult::WordDefinition(_) => self
                .meanings()
                .iter()
                .map(|m| format!("{}: {}", m.part_of_speech, primary_text(m)))
                .collect::<Vec<_>>()
                .join("\n"),
            LookupResult::PhraseTranslation { translated, .. } => translated.clone(),
            LookupResult::Failure(_) => String::new(),
        }
    }

    fn html_block(&self) -> String {
        let mut body = String::new();
        match self.lookup {
            LookupResult::WordDefinition(_) => {
                for meaning in self.meanings() {
                    body.push_str(&format!(
                        "<p><strong>{}:</strong> {}</p>",
                        meaning.part_of_speech,
                        primary_text(meaning)
                    ));
                    if let Some(example) = meaning.primary().and_then(|d| d.example.as_deref()) {
                        body.push_str(&format!("<p><em>Example: \"{}\"</em></p>", example));
                    }
                }
            }
            LookupResult::PhraseTranslation { translated, .. } => {
                body.push_str(&format!("<p><strong>Translation:</strong> {}</p>", translated));
            }
            LookupResult::Failure(_) => {}
        }
        if let Some(file) = self.media_file {
            body.push_str(&format!("<br>{}", image_markup(file)));
        }
        format!("<div style=\"font-family: Arial, sans-serif;\">{}</div>", body)
    }
}

fn primary_text(meaning: &Meaning) -> &str {
    meaning.primary().map(|d| d.definition.as_str()).unwrap_or("")
}

// 词典 API 的音标通常自带斜杠，统一成 `word /phonetic/`
fn head_with_phonetic(text: &str, def: &WordDefinition) -> String {
    match def.phonetic.as_deref().map(|p| p.trim().trim_matches('/')) {
        Some(phonetic) if !phonetic.is_empty() => format!("{} /{}/", text, phonetic),
        _ => text.to_string(),
    }
}

pub fn image_markup(file: &str) -> String {
    format!("<img src=\"{}\">", file)
}

fn is_slot_field(name: &str) -> bool {
    FIELD_ALIASES
        .iter()
        .any(|(_, aliases)| aliases.contains(&name))
}

/// 把查询结果映射到笔记类型的字段上
pub fn map_fields(
    schema: &NoteSchema,
    card: &CardContent<'_>,
) -> Result<FieldAssignment, ValidationError> {
    if schema.is_empty() {
        return Err(ValidationError::InvalidSchema);
    }

    let mut fields = FieldAssignment::new();
    let head_field = resolve_slot(schema, Slot::Head);
    let meaning_field = resolve_slot(schema, Slot::Meaning);

    match head_field {
        Some(name) => fields.assign(name, card.head()),
        // 没有正面字段但有意思字段：第一个字段不属于任何槽位时放正面内容
        None if meaning_field.is_some() && !is_slot_field(&schema.fields[0]) => {
            fields.assign(&schema.fields[0], card.head())
        }
        None => {}
    }
    if let Some(name) = meaning_field {
        fields.assign(name, card.meaning_lines());
    }
    if let (Some(name), Some(file)) = (resolve_slot(schema, Slot::Image), card.media_file) {
        fields.assign(name, image_markup(file));
    }
    if let Some(name) = resolve_slot(schema, Slot::Etymology) {
        fields.assign(name, "");
    }

    if head_field.is_none() && meaning_field.is_none() {
        let first = schema.fields[0].as_str();
        let block = card.html_block();
        match schema.fields.get(1) {
            Some(second) => {
                fields.assign(first, card.head());
                fields.assign(second, block);
            }
            // 只有一个字段时正面内容和释义块拼在一起
            None => fields.assign(first, format!("{}\n{}", card.head(), block)),
        }
    }

    Ok(fields)
}

/// 手动提交的映射：用户已经自己写好了意思
pub fn map_manual_fields(
    schema: &NoteSchema,
    word: &str,
    meaning: &str,
    image_html: Option<&str>,
) -> Result<FieldAssignment, ValidationError> {
    if schema.is_empty() {
        return Err(ValidationError::InvalidSchema);
    }

    let mut fields = FieldAssignment::new();
    let first = schema.fields[0].as_str();

    let head_field = resolve_slot(schema, Slot::Head).unwrap_or(first);
    fields.assign(head_field, word);

    let meaning_field = resolve_slot(schema, Slot::Meaning).or(schema.fields.get(1).map(|f| f.as_str()));
    match meaning_field {
        Some(name) => fields.assign(name, meaning),
        None => fields.assign(first, format!("{}\n\n{}", word, meaning)),
    }

    if let Some(html) = image_html {
        if let Some(name) = resolve_slot(schema, Slot::Image) {
            fields.assign(name, html);
        } else if schema.len() > 2 {
            fields.assign(&schema.fields[2], html);
        } else if let (2, Some(name)) = (schema.len(), meaning_field) {
            fields.append(name, &format!("<br><br>{}", html));
        }
    }

    if let Some(name) = resolve_slot(schema, Slot::Etymology) {
        fields.assign(name, "");
    }

    Ok(fields)
}
