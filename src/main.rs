//! schemac - compile YAML/JSON schema templates into JSON Schema.

mod build;
mod cli;
mod compiler;
mod config;
mod data;
mod logger;
mod utils;
mod watch;

use anyhow::Result;
use build::{build_all, create_session};
use clap::Parser;
use cli::Cli;
use config::SchemaConfig;
use watch::{BuildLoop, watch_blocking};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = SchemaConfig::load(&cli)?;

    let mut session = create_session(&config)?;
    let initial = build_all(&mut session, &config);

    if cli.once {
        return initial;
    }

    let mut build_loop = BuildLoop::new(session, &config);
    if let Err(e) = initial {
        log!("error"; "{e:#}");
        build_loop.mark_failed();
    }
    watch_blocking(build_loop, &config)
}
