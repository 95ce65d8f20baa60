pub mod auth;
pub mod cli;
pub mod clients;
pub mod config;
pub mod domain;
pub mod models;
pub mod services;
pub mod session;

use std::time::Duration;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, cmd_avatar, cmd_search, cmd_users};
pub use config::Config;
use models::SearchQuery;
pub use session::Session;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    init_tracing(&config.general.log_level, config.general.log_json);

    if matches!(cli.command, Commands::Init) {
        let created = match &cli.config {
            Some(path) => Config::create_default_at(path)?,
            None => Config::create_default_if_missing()?,
        };
        if created {
            println!("Created default config file");
        } else {
            println!("Config file already exists");
        }
        return Ok(());
    }

    config.validate()?;

    let session = Session::from_config(&config)?;
    match config.host_init_data() {
        Some(init_data) => {
            info!("Host init data found in ${}", config.host.init_data_env);
            session.host.publish(init_data);
        }
        None => debug!("No host init data; using configured fallback token"),
    }

    match cli.command {
        Commands::Search {
            query,
            ins_id,
            page,
            limit,
            wait_secs,
        } => {
            let mut query = SearchQuery::new(query.join(" "), ins_id, page);
            query.limit = limit;
            cmd_search(&session, query, Duration::from_secs(wait_secs)).await
        }
        Commands::Users { ids } => cmd_users(&session, &ids).await,
        Commands::Avatar { id, output } => cmd_avatar(&session, id, output.as_deref()).await,
        Commands::Init => Ok(()),
    }
}

fn init_tracing(log_level: &str, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .init();
}
