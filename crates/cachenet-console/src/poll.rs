//! Background polling of the REST API.
//!
//! Each endpoint has a ready flag. A tick dispatches a request only for
//! endpoints whose flag is up, so a slow endpoint never has two requests
//! outstanding and never holds up the others.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use cachenet_client::{ApiResult, ConsoleApi, Endpoint};

use crate::data::ConsoleData;

/// Per-endpoint "no request in flight" flags.
#[derive(Debug, Clone)]
pub struct ReadyFlags {
    flags: Arc<HashMap<Endpoint, AtomicBool>>,
}

impl Default for ReadyFlags {
    fn default() -> Self {
        let flags = Endpoint::ALL
            .iter()
            .map(|e| (*e, AtomicBool::new(true)))
            .collect();
        Self {
            flags: Arc::new(flags),
        }
    }
}

impl ReadyFlags {
    pub fn is_ready(&self, endpoint: Endpoint) -> bool {
        self.flags
            .get(&endpoint)
            .is_some_and(|f| f.load(Ordering::Acquire))
    }

    /// Lower the flag if it is up. The returned guard raises it again when
    /// dropped, whether the request succeeded or failed.
    pub fn try_acquire(&self, endpoint: Endpoint) -> Option<InFlight> {
        let flag = self.flags.get(&endpoint)?;
        flag.compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(InFlight {
            flags: self.flags.clone(),
            endpoint,
        })
    }
}

/// An outstanding request against one endpoint.
#[derive(Debug)]
pub struct InFlight {
    flags: Arc<HashMap<Endpoint, AtomicBool>>,
    endpoint: Endpoint,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Some(flag) = self.flags.get(&self.endpoint) {
            flag.store(true, Ordering::Release);
        }
    }
}

/// What one poll of one endpoint did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Updated,
    /// A previous request was still in flight.
    Skipped,
    /// The request failed; the previous data is kept.
    Failed,
}

/// Refreshes `ConsoleData` from the API.
#[derive(Clone)]
pub struct Poller {
    api: Arc<dyn ConsoleApi>,
    data: ConsoleData,
    ready: ReadyFlags,
}

impl Poller {
    pub fn new(api: Arc<dyn ConsoleApi>, data: ConsoleData) -> Self {
        Self {
            api,
            data,
            ready: ReadyFlags::default(),
        }
    }

    pub fn data(&self) -> &ConsoleData {
        &self.data
    }

    pub fn ready(&self) -> &ReadyFlags {
        &self.ready
    }

    /// Poll one endpoint unless a request to it is already outstanding.
    pub async fn poll_endpoint(&self, endpoint: Endpoint) -> PollOutcome {
        let Some(_in_flight) = self.ready.try_acquire(endpoint) else {
            debug!(%endpoint, "request in flight, skipping");
            return PollOutcome::Skipped;
        };

        match self.fetch(endpoint).await {
            Ok(()) => PollOutcome::Updated,
            Err(e) => {
                warn!(%endpoint, error = %e, "poll failed");
                PollOutcome::Failed
            }
        }
    }

    async fn fetch(&self, endpoint: Endpoint) -> ApiResult<()> {
        match endpoint {
            Endpoint::Deployment => {
                let records = self.api.list_deployments().await?;
                self.data.set_deployments(records).await;
            }
            Endpoint::Servers => {
                let records = self.api.list_servers().await?;
                self.data.set_servers(records).await;
            }
            Endpoint::Applications => {
                let records = self.api.list_applications().await?;
                self.data.set_applications(records).await;
            }
            Endpoint::ApplicationManagement => {
                let records = self.api.list_application_statuses().await?;
                self.data.set_statuses(records).await;
            }
            Endpoint::AvailableLogDates => {
                let records = self.api.available_log_dates().await?;
                self.data.set_log_dates(records).await;
            }
        }
        Ok(())
    }

    /// Poll every endpoint concurrently and wait for all of them.
    pub async fn poll_once(&self) -> Vec<(Endpoint, PollOutcome)> {
        let mut set = JoinSet::new();
        for endpoint in Endpoint::ALL {
            let poller = self.clone();
            set.spawn(async move { (endpoint, poller.poll_endpoint(endpoint).await) });
        }

        let mut outcomes = Vec::with_capacity(Endpoint::ALL.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!(error = %e, "poll task failed"),
            }
        }
        outcomes.sort_by_key(|(endpoint, _)| Endpoint::ALL.iter().position(|e| e == endpoint));
        outcomes
    }

    /// Start one request per ready endpoint without waiting for replies.
    pub fn tick(&self) {
        for endpoint in Endpoint::ALL {
            if !self.ready.is_ready(endpoint) {
                debug!(%endpoint, "request in flight, skipping");
                continue;
            }
            let poller = self.clone();
            tokio::spawn(async move {
                poller.poll_endpoint(endpoint).await;
            });
        }
    }

    /// Tick every `interval` until `shutdown` flips to true.
    pub async fn run(self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = interval.as_millis() as u64, "poller started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick(),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("poller stopped");
                        return;
                    }
                }
            }
        }
    }
}
