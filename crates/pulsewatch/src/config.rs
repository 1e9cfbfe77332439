//! Config resolution for the CLI: which file, and how its presentation
//! defaults combine with command-line flags.

use std::path::PathBuf;

use clap::ValueEnum;
use pulsewatch_config::Config;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// The config file in effect: `--config` / `PULSEWATCH_CONFIG`, else the
/// platform default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(pulsewatch_config::config_path)
}

/// Load and validate the active config. A missing file yields defaults.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = config_path(global);
    tracing::debug!(path = %path.display(), "loading config");
    Ok(pulsewatch_config::load_config_from(&path)?)
}

/// Resolved output settings for one invocation.
#[derive(Debug, Clone)]
pub struct Presentation {
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
}

impl Presentation {
    /// Flags win over the config's `[defaults]`; unparseable config values
    /// fall back to the built-in default.
    pub fn resolve(global: &GlobalOpts, cfg: &Config) -> Self {
        let format = global.output.clone().unwrap_or_else(|| {
            parse_or(&cfg.defaults.output, "defaults.output", OutputFormat::Table)
        });
        let color_mode = global
            .color
            .clone()
            .unwrap_or_else(|| parse_or(&cfg.defaults.color, "defaults.color", ColorMode::Auto));

        Self {
            format,
            color: output::should_color(&color_mode),
            quiet: global.quiet,
        }
    }
}

fn parse_or<T: ValueEnum>(raw: &str, field: &str, fallback: T) -> T {
    T::from_str(raw, true).unwrap_or_else(|_| {
        tracing::warn!(field, value = raw, "unrecognized value in config; using default");
        fallback
    })
}
