//! Command dispatch: bridges CLI args -> engine -> output formatting.

pub mod config_cmd;
pub mod eval;
pub mod rules;
pub mod watch;

use std::sync::Arc;

use pulsewatch_config::Config;
use pulsewatch_core::Engine;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::sink::TerminalSink;

/// Dispatch a parsed command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(args, global).await,
        Command::Eval(args) => eval::handle(args, global).await,
        Command::Rules(args) => rules::handle(args, global),
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(_) => Err(CliError::Engine {
            message: "completions are generated before dispatch".into(),
        }),
    }
}

/// Start an engine from the loaded config, delivering alerts to the terminal.
pub(crate) fn start_engine(cfg: &Config) -> Result<Engine, CliError> {
    let engine_config = cfg.engine_config().with_sink(Arc::new(TerminalSink));
    Ok(Engine::start(engine_config)?)
}
