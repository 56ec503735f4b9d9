pub mod cli;
pub mod config;
pub mod core;
pub mod providers;
pub mod resolver;
pub mod scheduler;
pub mod store;
pub mod updater;

use crate::config::AppConfig;
use crate::core::cache::TtlCache;
use crate::core::currency::CurrencyRegistry;
use crate::resolver::RateResolver;
use crate::scheduler::ParserScheduler;
use crate::store::RateStore;
use crate::updater::RatesUpdater;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum AppCommand {
    Setup,
    GetRate { from: String, to: String },
    UpdateRates { source: Option<String> },
    ShowRates { currency: Option<String>, top: Option<usize> },
    ListCurrencies,
    StartParser,
    ParserStatus,
}

/// The wired service graph. Construction order is explicit: store, then
/// updater, then resolver and scheduler on top. There is no global state;
/// every consumer goes through this instance.
pub struct App {
    pub config: AppConfig,
    pub registry: Arc<CurrencyRegistry>,
    pub store: Arc<RateStore>,
    pub updater: Arc<RatesUpdater>,
    pub resolver: RateResolver,
    pub scheduler: ParserScheduler,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(CurrencyRegistry::from_config(&config));
        let store = Arc::new(RateStore::new(&config.data_path()?));
        let updater = Arc::new(RatesUpdater::new(&config, Arc::clone(&store))?);
        let resolver = RateResolver::new(
            Arc::clone(&registry),
            Arc::clone(&store),
            Arc::clone(&updater),
            Arc::new(TtlCache::new()),
            config.rates_ttl(),
        );
        let scheduler = ParserScheduler::new(
            Arc::clone(&updater),
            Arc::clone(&store),
            config.update_interval_minutes,
            config.rates_ttl(),
        );

        Ok(Self {
            config,
            registry,
            store,
            updater,
            resolver,
            scheduler,
        })
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("ValutaHub starting...");

    // Setup creates the config file, so it runs before any config load.
    if let AppCommand::Setup = command {
        return cli::handle_setup();
    }

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let app = App::new(config)?;

    match command {
        // Returned from before the config load.
        AppCommand::Setup => Ok(()),
        AppCommand::GetRate { from, to } => cli::handle_get_rate(&app, &from, &to).await,
        AppCommand::UpdateRates { source } => {
            cli::handle_update_rates(&app, source.as_deref()).await
        }
        AppCommand::ShowRates { currency, top } => {
            cli::handle_show_rates(&app, currency.as_deref(), top)
        }
        AppCommand::ListCurrencies => cli::handle_list_currencies(&app),
        AppCommand::StartParser => cli::handle_start_parser(&app).await,
        AppCommand::ParserStatus => cli::handle_parser_status(&app),
    }
}
