// src/main.rs
//! Keyring command line tool
//! Describes derivation paths and, with the `hid` feature, watches USB
//! hot-plug activity for Ledger devices.
use anyhow::Result;
use clap::{Parser, Subcommand};
use hdwallet_keyring::path::{
    next_account_path, parse_bip32, slip44::known_coins, to_bip32_string, AccountPath, Chain,
};
use hdwallet_keyring::KeyringConfig;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "keyring")]
#[command(about = "HD wallet keyring tools")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe a derivation path as JSON
    Describe {
        /// Path such as m/44'/118'/0'/0/0
        path: String,
        /// Chain template name or coin symbol
        #[arg(long, default_value = "Kujira")]
        chain: Chain,
    },
    /// Print the account path following the given one
    NextAccount {
        path: String,
        #[arg(long, default_value = "Kujira")]
        chain: Chain,
    },
    /// List known SLIP-44 coin types
    Coins,
    /// Watch for Ledger devices and keep a keyring in sync
    #[cfg(feature = "hid")]
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging()?;

    let config = KeyringConfig::from_env();
    debug!(?config, "Configuration");

    match args.command {
        Commands::Describe { path, chain } => {
            let path = parse_bip32(&path)?;
            let description = chain.describe(&path);
            println!("{}", serde_json::to_string_pretty(&description)?);
        }
        Commands::NextAccount { path, chain } => {
            let current = AccountPath {
                address_n_list: parse_bip32(&path)?,
            };
            match next_account_path(chain, &current) {
                Some(next) => println!("{}", to_bip32_string(&next.address_n_list)),
                None => anyhow::bail!("{} is not a {} account path", path, chain),
            }
        }
        Commands::Coins => {
            for (coin, coin_type) in known_coins() {
                println!("{:<8} {}", coin, coin_type);
            }
        }
        #[cfg(feature = "hid")]
        Commands::Watch => watch(config).await?,
    }

    Ok(())
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(feature = "hid")]
async fn watch(config: KeyringConfig) -> Result<()> {
    use hdwallet_keyring::hardware::hid::HidDiscovery;
    use hdwallet_keyring::hardware::hotplug::spawn_hid_monitor;
    use hdwallet_keyring::hardware::LedgerUsbAdapter;
    use hdwallet_keyring::keyring::{EventKind, LoggingSubscriber, RoutingPattern};
    use hdwallet_keyring::Keyring;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    let keyring = Arc::new(Keyring::new());
    keyring.subscribe(Arc::new(LoggingSubscriber::new("watch")));

    let adapter = Arc::new(LedgerUsbAdapter::use_keyring(
        keyring.clone(),
        Arc::new(HidDiscovery::new()),
        &config,
    ));

    match adapter.initialize(None).await {
        Ok(count) => info!(sessions = count, "Ledger ready"),
        Err(e) => info!(error = %e, "No Ledger attached yet"),
    }

    // Register a session whenever a device (re)appears.
    let mut connects = keyring.subscribe_channel(RoutingPattern::kind(EventKind::Connect));
    let registrar = adapter.clone();
    tokio::spawn(async move {
        while let Some(event) = connects.recv().await {
            if let Err(e) = registrar.initialize(None).await {
                tracing::warn!(key = %event.key, error = %e, "Could not register Ledger session");
            }
        }
    });

    let (tx, rx) = mpsc::channel(32);
    let monitor = spawn_hid_monitor(adapter.vendor_id(), config.hotplug.poll_interval(), tx);

    tokio::select! {
        _ = adapter.run(rx) => {}
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    monitor.abort();
    keyring.remove_all().await;
    Ok(())
}
