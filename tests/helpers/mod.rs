// 本地假上游：词典、剑桥词典、翻译、图片下载、AnkiConnect 都由一个 axum 服务模拟

#![allow(dead_code)]

use anki_pocket::{AnkiCreator, AppState, Config, DatabaseManager, build_router};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const NOTE_ID: i64 = 1496198395707;

/// 假 AnkiConnect 的行为和它收到的请求
#[derive(Debug)]
pub struct FakeAnki {
    pub models: Vec<String>,
    /// None 表示 modelFieldNames 返回 null
    pub fields: Option<Vec<String>>,
    /// addNote 时返回的错误文本
    pub add_error: Option<String>,
    /// storeMediaFile 时返回的错误文本
    pub media_error: Option<String>,
    pub notes: Mutex<Vec<Value>>,
    pub media: Mutex<Vec<String>>,
}

impl Default for FakeAnki {
    fn default() -> Self {
        Self {
            models: vec!["Basic".to_string()],
            fields: Some(vec!["Front".to_string(), "Back".to_string()]),
            add_error: None,
            media_error: None,
            notes: Mutex::new(Vec::new()),
            media: Mutex::new(Vec::new()),
        }
    }
}

impl FakeAnki {
    pub fn with_fields(fields: &[&str]) -> Self {
        Self {
            fields: Some(fields.iter().map(|f| f.to_string()).collect()),
            ..Default::default()
        }
    }

    pub fn notes(&self) -> Vec<Value> {
        self.notes.lock().unwrap().clone()
    }

    pub fn media(&self) -> Vec<String> {
        self.media.lock().unwrap().clone()
    }
}

fn ok(result: Value) -> Json<Value> {
    Json(json!({ "result": result, "error": null }))
}

async fn anki_connect(State(anki): State<Arc<FakeAnki>>, Json(request): Json<Value>) -> Json<Value> {
    assert_eq!(request["version"], 6);
    let params = &request["params"];

    match request["action"].as_str().unwrap_or_default() {
        "version" => ok(json!(6)),
        "deckNames" => ok(json!(["Default", "English Vocabulary"])),
        "modelNames" => ok(json!(anki.models)),
        "modelFieldNames" => match &anki.fields {
            Some(fields) => ok(json!(fields)),
            None => ok(Value::Null),
        },
        "storeMediaFile" => {
            if let Some(error) = &anki.media_error {
                return Json(json!({ "result": null, "error": error }));
            }
            let filename = params["filename"].as_str().unwrap_or_default().to_string();
            anki.media.lock().unwrap().push(filename.clone());
            ok(json!(filename))
        }
        "addNote" => match &anki.add_error {
            Some(error) => Json(json!({ "result": null, "error": error })),
            None => {
                anki.notes.lock().unwrap().push(params["note"].clone());
                ok(json!(NOTE_ID))
            }
        },
        other => Json(json!({ "result": null, "error": format!("unsupported action {}", other) })),
    }
}

async fn dictionary_entry(Path(word): Path<String>) -> Response {
    match word.as_str() {
        "beautiful" => Json(json!([{
            "word": "beautiful",
            "phonetic": "/ˈbjuːtɪfəl/",
            "meanings": [
                {
                    "partOfSpeech": "adjective",
                    "definitions": [
                        {"definition": "Pleasing to the senses or mind aesthetically.", "example": "beautiful views"},
                        {"definition": "Of a very high standard; excellent."}
                    ]
                },
                {
                    "partOfSpeech": "verb",
                    "definitions": [{"definition": "to become beautiful"}]
                }
            ]
        }]))
        .into_response(),
        "empty" => Json(json!([])).into_response(),
        "broken" => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "title": "No Definitions Found" })),
        )
            .into_response(),
    }
}

async fn cambridge_page(Path(word): Path<String>) -> Response {
    match word.as_str() {
        "apple" => Html(
            r#"<html><body><div class="def ddef_d db">a round fruit with firm, white flesh and a
            <a class="query" href="/x">green</a>, red, or yellow skin</div></body></html>"#,
        )
        .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn translate(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let text = params.get("q").cloned().unwrap_or_default();
    assert_eq!(params.get("langpair").map(String::as_str), Some("en|ja"));

    // 以 "fail " 开头的文本模拟翻译服务拒绝
    if text.starts_with("fail ") {
        return Json(json!({
            "responseData": null,
            "responseStatus": "403",
            "responseDetails": "QUOTA EXCEEDED"
        }));
    }

    let translated = match text.as_str() {
        "it is a piece of cake" => "朝飯前です".to_string(),
        other => format!("[ja] {}", other),
    };
    Json(json!({
        "responseData": { "translatedText": translated },
        "responseStatus": 200,
        "responseDetails": ""
    }))
}

async fn image() -> impl IntoResponse {
    ([("content-type", "image/png")], vec![0x89u8, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a])
}

/// 在 127.0.0.1 随机端口启动假上游，返回基础 URL
pub async fn spawn_upstream(anki: Arc<FakeAnki>) -> String {
    let app = Router::new()
        .route("/anki", post(anki_connect))
        .route("/entries/en/:word", get(dictionary_entry))
        .route("/cambridge/:word", get(cambridge_page))
        .route("/translate", get(translate))
        .route("/image.png", get(image))
        .with_state(anki);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// 所有外部地址都指向假上游的配置
pub fn config_for(base: &str) -> Config {
    let mut config = Config::default();
    config.anki.endpoint = format!("{}/anki", base);
    config.lookup.dictionary_url = format!("{}/entries/en", base);
    config.lookup.cambridge_url = format!("{}/cambridge", base);
    config.lookup.translation_url = format!("{}/translate", base);
    config.lookup.placeholder_url = format!("{}/image.png", base);
    config.lookup.unsplash_access_key = None;
    config.processing.request_timeout_seconds = 5;
    config
}

pub struct TestApp {
    pub router: Router,
    pub anki: Arc<FakeAnki>,
    pub db: DatabaseManager,
    pub config: Config,
    _dir: TempDir,
}

pub async fn spawn_app(anki: FakeAnki) -> TestApp {
    spawn_app_with(anki, |_, _| {}).await
}

/// 启动前可以改配置，例如把某个上游地址指向不存在的路由
pub async fn spawn_app_with(anki: FakeAnki, configure: impl FnOnce(&mut Config, &str)) -> TestApp {
    let anki = Arc::new(anki);
    let base = spawn_upstream(anki.clone()).await;
    let mut config = config_for(&base);
    configure(&mut config, base.as_str());

    let dir = tempfile::tempdir().unwrap();
    let db = DatabaseManager::new(dir.path().join("settings.db")).await.unwrap();
    let creator = AnkiCreator::new(&config).unwrap();
    let router = build_router(AppState::new(creator, db.clone()));

    TestApp {
        router,
        anki,
        db,
        config,
        _dir: dir,
    }
}
