use std::sync::Arc;

use tracing::{error, info};

use studyolle::db::ZoneRepository;
use studyolle::mail::sender_from_config;
use studyolle::{AppState, Config, Database, SessionKeys, SystemClock, WebServer};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = studyolle::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        studyolle::logging::init_console_only(&config.logging.level);
    }

    info!("StudyOlle - study group community");

    if let Err(e) = run(config).await {
        error!("Fatal: {e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> studyolle::Result<()> {
    config.validate()?;

    let db = Database::open(&config.database.path).await?;
    info!("Database opened at {}", config.database.path);

    ZoneRepository::new(db.pool()).seed_defaults().await?;

    let mailer = sender_from_config(&config.mail)?;
    let sessions = SessionKeys::new(
        &config.session.secret,
        config.session.expiry_secs,
        config.session.secure_cookie,
    );
    let state = AppState::new(
        db.pool().clone(),
        mailer,
        Arc::new(SystemClock),
        &config.server.base_url,
        sessions,
    );

    let server = WebServer::new(&config.server, state)?;
    info!(
        "Server configured on {}:{}",
        config.server.host, config.server.port
    );
    server.run().await
}
