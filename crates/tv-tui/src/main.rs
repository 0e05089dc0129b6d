mod action;
mod app;
mod components;
mod mpv;
mod native;
mod player;
mod theme;
mod widgets;

use tv_proto::{CatalogSource, Config};

const USAGE: &str = "usage: tvdeck [CATALOG]

  CATALOG   channel list to load: an http(s) URL or a local .json/.m3u file
            (default: [catalog] source in the config file)

keys: / search · j/k move · Enter play · s stop · y copy url · q quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let arg = std::env::args().nth(1);
    if matches!(arg.as_deref(), Some("-h") | Some("--help")) {
        println!("{}", USAGE);
        return Ok(());
    }

    let data_dir = tv_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("tvdeck.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // RUST_LOG overrides; keep HTTP client internals quiet by default.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("tvdeck log: {}", log_path.display());

    tracing::info!("tvdeck starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("config: {:#}, using defaults", e);
            Config::default()
        }
    };
    let source = CatalogSource::parse(arg.as_deref().unwrap_or(&config.catalog.source));
    tracing::info!("catalog source: {}", source);

    // ── Playback host ────────────────────────────────────────────────────────
    let player = player::Player::start(&config.native).await;

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let app = app::App::new(&config, source, player, log_path);
    app.run().await
}
