pub mod cli;
pub mod commands;
pub mod core;
pub mod fetchers;
pub mod stores;

use crate::core::{
    error::{Error, ErrorKind, Result},
    registration::RegistrationTracker,
    sync::Synchronizer,
};
use clap::Parser;
use cli::{Cli, Command};
use fetchers::http::HttpHistoryFetcher;
use log::debug;
use nb_from_env::{FromEnv, FromEnvDerive};
use std::time::Duration;
use stores::sqlite::SqliteStore;

#[derive(FromEnvDerive)]
struct Config {
    history_url: String,
    database_url: String,
    history_token: String,
    fetch_timeout_secs: String,
    refresh_interval_secs: String,
}

#[derive(Debug)]
struct Settings {
    history_url: String,
    database_url: String,
    history_token: Option<String>,
    fetch_timeout: Duration,
    refresh_interval: Duration,
}

fn parse_secs(name: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .ok_or_else(|| {
            Error::new(
                format!(
                    "{} must be a positive number of seconds, got {:?}",
                    name, value
                ),
                ErrorKind::Config,
            )
        })
}

impl TryFrom<Config> for Settings {
    type Error = Error;

    fn try_from(config: Config) -> Result<Self> {
        let token = config.history_token.trim().to_owned();
        let fetch_timeout =
            parse_secs("FETCH_TIMEOUT_SECS", &config.fetch_timeout_secs)?;
        let refresh_interval =
            parse_secs("REFRESH_INTERVAL_SECS", &config.refresh_interval_secs)?;
        Ok(Settings {
            fetch_timeout,
            refresh_interval,
            history_url: config.history_url,
            database_url: config.database_url,
            history_token: (!token.is_empty()).then_some(token),
        })
    }
}

fn history_fetcher(settings: &Settings) -> Result<HttpHistoryFetcher> {
    HttpHistoryFetcher::new(
        settings.history_url.clone(),
        settings.history_token.clone(),
        settings.fetch_timeout,
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(
        env_logger::Env::new().default_filter_or("info"),
    );
    let cli = Cli::parse();
    let settings = Settings::try_from(Config::from_env())?;
    debug!("using history endpoint {}", settings.history_url);

    let store = SqliteStore::connect(&settings.database_url).await?;
    match cli.command {
        Command::Sync => {
            let fetcher = history_fetcher(&settings)?;
            let synchronizer = Synchronizer::new(store, fetcher);
            commands::sync(&synchronizer).await?;
        }
        Command::Watch => {
            let fetcher = history_fetcher(&settings)?;
            let synchronizer = Synchronizer::new(store, fetcher);
            commands::watch(&synchronizer, settings.refresh_interval).await?;
        }
        Command::History => commands::history(&store).await?,
        Command::Show { id } => commands::show(&store, &id).await?,
        Command::Status => {
            let tracker = RegistrationTracker::load(store).await?;
            commands::status(&tracker).await?;
        }
        Command::Register(args) => {
            let tracker = RegistrationTracker::load(store).await?;
            let token = args.token.as_deref();
            commands::register(&tracker, token, args.fail.as_deref()).await?;
        }
    }
    Ok(())
}
