
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, ConfigError, HighlightConfig, ServiceConfig};
use crate::analysis::AnalysisClient;
use crate::highlight::HighlightMode;

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 wordlens Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Analysis Service").bold().yellow());
    eprintln!("Configure the service that tokenizes text and provides word embeddings.");
    eprintln!();

    configure_service(&mut config.service)?;

    eprintln!();
    eprintln!("{}", style("Highlighting").bold().yellow());
    configure_highlight(&mut config.highlight)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_service_connection(&config.service) {
        eprintln!("{}", style("✓ Analysis service is reachable!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to the analysis service").yellow()
        );
        eprintln!("You can continue, but make sure the service is running before analyzing text.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Analysis Service:").bold().yellow());
    eprintln!("  Host: {}", style(&config.service.host).cyan());
    eprintln!("  Port: {}", style(config.service.port).cyan());
    eprintln!(
        "  Embeddings: {}",
        style(config.service.include_embeddings).cyan()
    );
    eprintln!(
        "  Timeout: {}s",
        style(config.service.timeout_seconds).cyan()
    );
    match config.service_url() {
        Ok(url) => eprintln!("  Service URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Service URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Highlighting:").bold().yellow());
    eprintln!(
        "  Leave debounce: {}ms",
        style(config.highlight.leave_debounce_ms).cyan()
    );
    eprintln!(
        "  Similar words: {}",
        style(config.highlight.similar_words).cyan()
    );
    eprintln!(
        "  Default mode: {}",
        style(config.highlight.default_mode).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    let config_dir = Config::default_dir()?;
    Config::load(&config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.clone(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_service(service: &mut ServiceConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == service.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Service protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Service host")
        .default(service.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = ServiceConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..service.clone()
            };
            temp_config.service_url()?;
            Ok(())
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Service port")
        .default(service.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let include_embeddings = Confirm::new()
        .with_prompt("Request word embeddings?")
        .default(service.include_embeddings)
        .interact()?;

    service.set_protocol(protocol)?;
    service.set_host(host)?;
    service.set_port(port)?;
    service.include_embeddings = include_embeddings;

    Ok(())
}

fn configure_highlight(highlight: &mut HighlightConfig) -> Result<()> {
    let debounce: u64 = Input::new()
        .with_prompt("Leave debounce (ms)")
        .default(highlight.leave_debounce_ms)
        .validate_with(|input: &u64| -> Result<(), &str> {
            if (10..=2000).contains(input) {
                Ok(())
            } else {
                Err("Debounce must be between 10 and 2000 ms")
            }
        })
        .interact_text()?;

    let similar_words: usize = Input::new()
        .with_prompt("Similar words to highlight")
        .default(highlight.similar_words)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=5).contains(input) {
                Ok(())
            } else {
                Err("Must be between 1 and 5")
            }
        })
        .interact_text()?;

    let modes = [HighlightMode::CoOccurrence, HighlightMode::Similarity];
    let default_index = modes
        .iter()
        .position(|&m| m == highlight.default_mode)
        .unwrap_or(0);
    let mode_index = Select::new()
        .with_prompt("Default highlight mode")
        .default(default_index)
        .items(&modes)
        .interact()?;

    highlight.set_leave_debounce_ms(debounce)?;
    highlight.set_similar_words(similar_words)?;
    highlight.default_mode = modes[mode_index];

    Ok(())
}

fn test_service_connection(service: &ServiceConfig) -> bool {
    AnalysisClient::new(service)
        .map(|client| client.with_timeout(Duration::from_secs(5)))
        .is_ok_and(|client| client.health().is_ok())
}
