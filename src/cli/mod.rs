//! Thin command handlers over the core engine. Everything here is
//! presentation; the engine types do the work.

pub mod ui;

use crate::App;
use crate::core::error::CoreError;
use anyhow::Result;
use tracing::info;

/// Writes a default configuration file, refusing to overwrite an existing
/// one. Needs no constructed `App` since there is no config to load yet.
pub fn handle_setup() -> Result<()> {
    use anyhow::Context;

    let path = crate::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
providers:
  coingecko:
    base_url: "https://api.coingecko.com/api/v3"
  exchangerate:
    base_url: "https://v6.exchangerate-api.com/v6"
    # api_key: "..."  # or set EXCHANGERATE_API_KEY

base_currency: "USD"
update_interval_minutes: 5
rates_ttl_seconds: 300
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    info!("Created default configuration at {}", path.display());
    Ok(())
}

/// Prints the resolved rate for a pair, plus the cached reverse rate when
/// the snapshot has one.
pub async fn handle_get_rate(app: &App, from: &str, to: &str) -> Result<()> {
    match app.resolver.resolve(from, to).await {
        Ok(resolved) => {
            println!(
                "1 {} = {} {}",
                from.to_uppercase(),
                ui::format_rate(resolved.rate),
                to.to_uppercase()
            );
            println!(
                "Updated: {}  Source: {}",
                resolved.updated_at.format("%Y-%m-%d %H:%M:%S UTC"),
                resolved.source
            );

            let reverse_key = crate::core::rates::pair_key(to, from);
            if let Some(entry) = app.store.read_snapshot().pairs.get(&reverse_key) {
                println!(
                    "Reverse rate {}->{}: {}",
                    to.to_uppercase(),
                    from.to_uppercase(),
                    ui::format_rate(entry.rate)
                );
            }
            Ok(())
        }
        Err(e) => {
            print_error_hint(&e);
            Err(e.into())
        }
    }
}

/// Runs an aggregate update over the selected sources and reports the
/// outcome. `all` (or no selector) requests every configured source.
pub async fn handle_update_rates(app: &App, source: Option<&str>) -> Result<()> {
    println!("Starting rates update...");

    let selected: Option<Vec<String>> = match source {
        None | Some("all") => None,
        Some(name) => Some(vec![name.to_string()]),
    };

    let result = app.updater.run_update(selected.as_deref()).await;

    if result.is_total_failure() {
        println!("Update failed for all sources");
        println!("Check logs for details.");
        anyhow::bail!("update failed for all requested sources");
    }

    println!(
        "Successfully updated from: {}",
        result.successful_sources.join(", ")
    );
    println!("Total rates updated: {}", result.total_rates);
    println!("Duration: {:.2}s", result.duration_seconds);
    if !result.failed_sources.is_empty() {
        println!("Failed sources: {}", result.failed_sources.join(", "));
        println!("Check logs for details.");
    }
    Ok(())
}

/// Lists the cached snapshot: optional filter on either side of the pair,
/// sorted by rate descending, truncated to the top N.
pub fn handle_show_rates(app: &App, currency: Option<&str>, top: Option<usize>) -> Result<()> {
    let snapshot = app.store.read_snapshot();

    if snapshot.pairs.is_empty() {
        println!("Local rates cache is empty. Run 'update' to load data.");
        return Ok(());
    }

    let last_refresh = snapshot
        .last_refresh
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    println!("Rates from cache (updated at {last_refresh}):");

    let mut pairs: Vec<_> = snapshot.pairs.iter().collect();
    if let Some(code) = currency {
        let code = code.to_uppercase();
        pairs.retain(|(key, _)| {
            key.starts_with(&format!("{code}_")) || key.ends_with(&format!("_{code}"))
        });
        if pairs.is_empty() {
            println!("No cached rate found for '{code}'.");
            return Ok(());
        }
    }

    pairs.sort_by(|a, b| b.1.rate.total_cmp(&a.1.rate));
    if let Some(top) = top {
        pairs.truncate(top);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Pair"),
        ui::header_cell("Rate"),
        ui::header_cell("Updated"),
        ui::header_cell("Source"),
    ]);
    for (key, entry) in &pairs {
        table.add_row(vec![
            comfy_table::Cell::new(key),
            ui::rate_cell(ui::format_rate(entry.rate)),
            comfy_table::Cell::new(entry.updated_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            comfy_table::Cell::new(&entry.source),
        ]);
    }
    println!("{table}");
    println!("Total pairs: {}", pairs.len());
    Ok(())
}

/// Lists every supported currency with its display metadata.
pub fn handle_list_currencies(app: &App) -> Result<()> {
    println!("Supported currencies:");
    for currency in app.registry.all() {
        println!("  {}", currency.display_info());
    }
    println!("\nTotal: {} currencies", app.registry.len());
    Ok(())
}

/// Starts the background scheduler and keeps it running until Ctrl-C.
pub async fn handle_start_parser(app: &App) -> Result<()> {
    app.scheduler.start();
    println!("Parser scheduler started");
    println!(
        "Update interval: {} minutes (Ctrl-C to stop)",
        app.config.update_interval_minutes
    );

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, stopping scheduler");
    app.scheduler.stop();
    println!("Parser scheduler stopped");
    Ok(())
}

/// Prints scheduler state and snapshot freshness.
pub fn handle_parser_status(app: &App) -> Result<()> {
    let status = app.scheduler.status();

    println!("Parser Service Status:");
    println!(
        "Status: {}",
        if status.is_running { "RUNNING" } else { "STOPPED" }
    );
    if status.is_running {
        println!("Update interval: {} minutes", status.update_interval_minutes);
        println!("Active jobs: {}", status.jobs_count);
    }

    let last = status
        .last_refresh
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "Never".to_string());
    println!("\nLast update: {last}");
    println!(
        "Data freshness: {}",
        if status.is_fresh { "FRESH" } else { "STALE" }
    );
    if let Some(age) = status.age_seconds {
        println!("Data age: {:.1} minutes", age as f64 / 60.0);
    }
    Ok(())
}

/// One-line user-facing hint per failure kind.
fn print_error_hint(error: &CoreError) {
    eprintln!("{error}");
    match error {
        CoreError::CurrencyNotFound { .. } => {
            eprintln!("Use 'currencies' to list the supported codes.");
        }
        CoreError::ApiRequest { .. } => {
            eprintln!("The rate providers may be unavailable; try again later.");
        }
        _ => {}
    }
}
