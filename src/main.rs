// ██████╗ ███████╗███╗   ██╗████████╗    ██████╗ ██╗███████╗██╗  ██╗
// ██╔══██╗██╔════╝████╗  ██║╚══██╔══╝    ██╔══██╗██║██╔════╝██║ ██╔╝
// ██████╔╝█████╗  ██╔██╗ ██║   ██║       ██████╔╝██║███████╗█████╔╝
// ██╔══██╗██╔══╝  ██║╚██╗██║   ██║       ██╔══██╗██║╚════██║██╔═██╗
// ██║  ██║███████╗██║ ╚████║   ██║       ██║  ██║██║███████║██║  ██╗
// ╚═╝  ╚═╝╚══════╝╚═╝  ╚═══╝   ╚═╝       ╚═╝  ╚═╝╚═╝╚══════╝╚═╝  ╚═╝
//
// E N G I N E
//
// Reads the fleet ledger, works out where every driver stands in their
// billing cycle, and tells the collections desk who to call first.
//
// Run once (the default) or set RENT_RISK_POLL_SECS to keep re-evaluating
// until Ctrl+C.

use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use rent_risk_engine::config::Config;
use rent_risk_engine::engine::Engine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    info!("🚗 RENT RISK ENGINE initializing...");

    let config = Config::from_env();
    info!(
        ledger = %config.ledger_path.display(),
        rule = %config.highlight_rule,
        hide_remind_status = config.hide_remind_status,
        "✅ Configuration loaded"
    );
    if config.highlight_rule.is_legacy() {
        warn!(
            rule = %config.highlight_rule,
            "Legacy highlight rule in use, severe tier is disabled"
        );
    }

    let poll_interval = config.poll_interval;
    let engine = Arc::new(Engine::new(config));

    if poll_interval.is_zero() {
        println!("{}", engine.run_blocking().await?);
        return Ok(());
    }

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => warn!("🛑 Shutdown signal received!"),
            Err(err) => error!("❌ Signal listener error: {}", err),
        }
        let _ = shutdown_tx.send(true);
    });

    info!(every_secs = poll_interval.as_secs(), "⏱️  Polling ledger, Ctrl+C to stop");
    let mut ticker = tokio::time::interval(poll_interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // A bad ledger write shouldn't kill the watcher. Next tick retries.
                match engine.clone().run_blocking().await {
                    Ok(report) => println!("{report}"),
                    Err(err) => error!("❌ Evaluation pass failed: {:#}", err),
                }
            }
            _ = shutdown_rx.changed() => break,
        }
    }

    info!("💤 RENT RISK ENGINE: OFFLINE");
    Ok(())
}
