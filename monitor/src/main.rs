use clap::Parser;
use log::{error, info, warn};
use monitor::config::{Config, EXAMPLE_CONFIG};
use monitor::error::MonitorError;
use monitor::notifier::{Disabled, Notifier, TelegramNotifier};
use monitor::poller::Poller;
use monitor::rules::load_rules;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file to load
    #[arg(default_value = "isr.cfg")]
    config: PathBuf,

    /// Print an example config file and exit
    #[arg(long)]
    example_config: bool,
}

fn print_header() {
    let title = format!("Game Server Receptionist v{}", env!("CARGO_PKG_VERSION"));
    println!("\n {}\n {}\n", title, "~".repeat(title.len()));
}

/// Runs the poller until it fails or Ctrl+C is pressed
async fn run<N: Notifier>(mut poller: Poller<N>) -> Result<(), MonitorError> {
    tokio::select! {
        result = poller.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), MonitorError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.example_config {
        print!("{}", EXAMPLE_CONFIG);
        return Ok(());
    }

    print_header();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!(" Use --example-config to see an example.");
            return Err(e.into());
        }
    };
    let rules = load_rules(&config.rule_file);

    if config.notifications_enabled() {
        match TelegramNotifier::new(&config.bot_token, &config.channel_id, &config.message_id_file)
        {
            Ok(notifier) => return run(Poller::from_config(&config, rules, notifier)).await,
            Err(e) => warn!("Telegram notifications disabled: {}", e),
        }
    }

    run(Poller::from_config(&config, rules, Disabled)).await
}
