// Configuration management module
// TOML settings for the analysis service connection and highlight behavior

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{Config, ConfigError, HighlightConfig, ServiceConfig};
