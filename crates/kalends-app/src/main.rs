use clap::Parser;
use kalends_app::cli::Cli;
use kalends_app::error::AppError;
use kalends_app::report::collect;
use kalends_core::config::load_config;
use kalends_rfc::rfc::ical::expand::RuleBuilder;
use kalends_rfc::rfc::ical::timezone::TimezoneResolver;
use kalends_rfc::rfc::ical::{ExpandOptions, Expander, parse_chunked_with_rules, parse_with_rules};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    let config = load_config()?;

    tracing::debug!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    let resolver = TimezoneResolver::from_settings(&config)?;
    tracing::info!(host_zone = %resolver.host_zone(), "Timezone resolver ready");

    let text = tokio::fs::read_to_string(&cli.file)
        .await
        .map_err(|source| AppError::ReadError {
            path: cli.file.display().to_string(),
            source,
        })?;

    let rules = RuleBuilder::new(&resolver).with_max_instances(config.expansion.max_instances);
    let document = if cli.chunked {
        parse_chunked_with_rules(&text, rules, config.parser.chunk_lines).await?
    } else {
        parse_with_rules(&text, rules)?
    };
    tracing::info!(
        components = document.components.len(),
        diagnostics = document.diagnostics.len(),
        "Parsed {}",
        cli.file.display()
    );

    let options = ExpandOptions::new(cli.from, cli.to)
        .include_overrides(!cli.no_overrides)
        .exclude_exdates(!cli.keep_exdates)
        .expand_ongoing(cli.ongoing)
        .max_instances(config.expansion.max_instances);

    let reports = collect(
        &document,
        &Expander::new(&resolver),
        &options,
        cli.uid.as_deref(),
        &config.expansion.locale,
    )?;

    println!("{}", serde_json::to_string_pretty(&reports)?);

    Ok(())
}
