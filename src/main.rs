mod argsets;
mod command;
mod config;
mod constants;
mod data_mgmt;
mod helpers;
mod interfaces;

use anyhow::{anyhow, Result};
use env_logger::Env;

use argsets::{PushArgs, USAGE};
use constants::{defaults, envvars};
use interfaces::SinkConfig;

fn main() -> Result<()> {
    let dotenv_loaded = helpers::load_dotenv();
    env_logger::Builder::from_env(Env::default().filter_or(envvars::LOG_LEVEL, defaults::LOG_LEVEL))
        .init();
    if dotenv_loaded {
        log::debug!("Loaded environment from .env");
    }

    let args = PushArgs::from_env().map_err(|e| anyhow!("{e}\n\n{USAGE}"))?;
    if args.help {
        print!("{USAGE}");
        return Ok(());
    }

    let config = args.into_config(SinkConfig::from_env())?;
    command::finish(command::push(&config), config.strict)
}
