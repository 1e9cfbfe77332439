//! Config subcommand handlers.

use pulsewatch_config::Config;
use pulsewatch_core::default_rules;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Presentation};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: starter file with the built-in rules spelled out ──
        ConfigCommand::Init { force } => {
            let path = config::config_path(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let cfg = Config {
                rules: default_rules(),
                ..Config::default()
            };
            pulsewatch_config::save_config_to(&cfg, &path)?;

            if !global.quiet {
                eprintln!("Wrote {} rule(s) to {}", cfg.rules.len(), path.display());
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let view = Presentation::resolve(global, &cfg);
            let toml = pulsewatch_config::to_toml(&cfg)?;
            let out = output::render_single(
                &view.format,
                &cfg,
                |_| toml.trim_end().to_owned(),
                |_| toml.trim_end().to_owned(),
            )?;
            output::print_output(&out, view.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path(global).display().to_string(), false);
            Ok(())
        }
    }
}
