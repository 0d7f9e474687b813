use std::collections::BTreeMap;

use tokio::sync::watch;
use tracing::info;

use cachenet_console::ConsoleSession;

/// Run the poller and log a summary every interval until Ctrl-C.
pub async fn run(session: &ConsoleSession) -> anyhow::Result<()> {
    let interval = session.config().poll_interval();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = tokio::spawn(session.poller().clone().run(interval, shutdown_rx));

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = session.data().snapshot().await;
                let mut states: BTreeMap<&str, usize> = BTreeMap::new();
                for record in &snapshot.deployments {
                    *states.entry(record.state.as_str()).or_default() += 1;
                }
                info!(
                    nodes = snapshot.deployments.len(),
                    servers = snapshot.servers.len(),
                    applications = snapshot.applications.len(),
                    ?states,
                    "topology"
                );
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
                break;
            }
        }
    }

    poller.await?;
    Ok(())
}
