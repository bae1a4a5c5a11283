use anyhow::Result;
use quipbot::app::handler::QuoteBot;
use quipbot::irc::manager::IrcManager;
use quipbot::{config, logging};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = config::load_config()?;
    logging::init_tracing(&cfg.logging);

    info!(
        servers = cfg.servers.len(),
        channel = %cfg.channel,
        nickname = %cfg.identity.nickname,
        "starting"
    );

    let bot = QuoteBot::from_config(&cfg);
    let mut manager = IrcManager::new(&cfg, bot)?;

    let result = tokio::select! {
        result = manager.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
