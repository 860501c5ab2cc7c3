use anki_pocket::models::{DictionarySource, InputMode, Settings};
use anki_pocket::{AnkiCreator, AppState, Config, DatabaseManager, build_router};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "anki-pocket", version, about = "英语单词/短语一键生成 Anki 卡片")]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, env = "ANKI_POCKET_CONFIG", default_value = anki_pocket::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 启动 HTTP 服务（默认）
    Serve {
        /// 覆盖配置文件中的监听地址
        #[arg(long)]
        bind: Option<String>,
    },
    /// 直接提交一个单词或短语
    Add {
        text: String,
        /// 本次使用的牌组，不写入设置
        #[arg(long)]
        deck: Option<String>,
    },
    /// 查看或修改设置
    Settings {
        #[arg(long)]
        deck: Option<String>,
        /// free-dictionary 或 cambridge
        #[arg(long)]
        source: Option<DictionarySource>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load_from(&cli.config)?;
    let db = DatabaseManager::new(&config.database.db_file).await?;

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => serve(config, db, bind).await,
        Command::Add { text, deck } => add(&config, &db, &text, deck).await,
        Command::Settings { deck, source } => settings(&db, deck, source).await,
    }
}

async fn serve(config: Config, db: DatabaseManager, bind: Option<String>) -> Result<()> {
    info!("📚 anki-pocket v{}", env!("CARGO_PKG_VERSION"));

    let creator = AnkiCreator::new(&config)?;
    match creator.anki().version().await {
        Ok(version) => info!("✓ AnkiConnect 在线 (version {})", version),
        Err(e) => error!("AnkiConnect 不可用，提交卡片前请先启动 Anki: {}", e),
    }

    let address = bind.unwrap_or(config.server.bind_address);
    let app = build_router(AppState::new(creator, db));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("监听 http://{}", address);
    info!("健康检查: http://{}/health", address);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn add(config: &Config, db: &DatabaseManager, text: &str, deck: Option<String>) -> Result<()> {
    let mut settings = db.load_settings().await?;
    if let Some(deck) = deck {
        settings.deck_name = deck;
    }

    let creator = AnkiCreator::new(config)?;
    println!("📖 处理: {}", text);

    let outcome = match creator.process(text, &settings).await {
        Ok(outcome) => outcome,
        Err(e) => {
            println!("❌ 失败 [{}]: {}", e.category(), e);
            if let anki_pocket::error::AppError::Automation(anki) = &e {
                println!("   {}", anki.remediation());
            }
            return Err(e.into());
        }
    };

    match outcome.mode {
        InputMode::Word => println!("📝 单词: {}", outcome.word.as_deref().unwrap_or(text)),
        InputMode::Phrase => println!(
            "🌐 短语: {} -> {}",
            outcome.original_text.as_deref().unwrap_or(text),
            outcome.translated_text.as_deref().unwrap_or("")
        ),
    }
    if let Some(url) = &outcome.image_url {
        println!("🖼️  图片: {}", url);
    }
    println!("🎉 已添加到牌组 {} (note {})", settings.deck_name, outcome.anki_note_id);
    Ok(())
}

async fn settings(db: &DatabaseManager, deck: Option<String>, source: Option<DictionarySource>) -> Result<()> {
    let current = db.load_settings().await?;

    let settings = if deck.is_some() || source.is_some() {
        let updated = Settings {
            deck_name: deck.unwrap_or(current.deck_name),
            dictionary_source: source.unwrap_or(current.dictionary_source),
        };
        db.save_settings(&updated).await?;
        updated
    } else {
        current
    };

    println!("📋 当前设置");
    println!("   牌组: {}", settings.deck_name);
    println!("   词典: {}", settings.dictionary_source.as_str());
    Ok(())
}
