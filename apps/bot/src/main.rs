mod bot;
mod config;
mod error;
mod main_lib;
mod venue;

use config::Config;
use main_lib::{build_bot, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::from_env();
    config.validate()?;
    config.log_summary();

    let mut bot = build_bot(&config)?;
    bot.initialize().await?;
    bot.run().await
}
