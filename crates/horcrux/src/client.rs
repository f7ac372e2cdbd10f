//! client orchestrator: fan out to every holder, stop at quorum, combine
//!
//! ```text
//!          recompose
//!              │ validate list (no network on failure)
//!   ┌──────────┼──────────┐
//!   ▼          ▼          ▼
//! attempt   attempt    attempt      one task per holder
//!   │          │          │         request → send (timeout) → verify
//!   └── reached ≥ threshold ──▶ cancel broadcast
//!              │
//!          join all
//!              │ enough shards? combine : report
//!              ▼
//!           secret
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::codec::Encoding;
use crate::env::configure_client_environment;
use crate::handshake::{generate_request, verify_response};
use crate::report::{AttemptReport, AttemptStatus, Report};
use crate::state::{HorcruxList, HorcruxServer};
use crate::transport::Transport;
use crate::tss;
use crate::{Error, Result};

/// per-attempt timeout unless overridden
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// load the client configuration from the environment
pub fn find_horcruxes() -> Result<HorcruxList> {
    configure_client_environment()
}

pub struct Client<T> {
    horcruxes: HorcruxList,
    transport: Arc<T>,
    timeout: Duration,
    encoding: Encoding,
}

impl<T: Transport + 'static> Client<T> {
    pub fn new(horcruxes: HorcruxList, transport: T) -> Self {
        Self {
            horcruxes,
            transport: Arc::new(transport),
            timeout: DEFAULT_TIMEOUT,
            encoding: Encoding::default(),
        }
    }

    /// per-attempt timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// encoding of the recomposed secret
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn horcruxes(&self) -> &HorcruxList {
        &self.horcruxes
    }

    /// recover the master secret
    pub async fn recompose_secret(&self) -> Result<String> {
        self.recompose().await.map(|(secret, _)| secret)
    }

    /// recover the master secret along with the per-holder report
    pub async fn recompose(&self) -> Result<(String, Report)> {
        self.horcruxes.validate()?;

        let threshold = self.horcruxes.threshold;
        let reached = Arc::new(AtomicUsize::new(0));
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let cancel_tx = Arc::new(cancel_tx);

        debug!(
            servers = self.horcruxes.servers.len(),
            threshold,
            "contacting horcruxes"
        );

        let handles: Vec<_> = self
            .horcruxes
            .servers
            .iter()
            .map(|server| {
                let attempt = Attempt {
                    server: server.clone(),
                    transport: self.transport.clone(),
                    timeout: self.timeout,
                    threshold,
                    reached: reached.clone(),
                    cancel_tx: cancel_tx.clone(),
                    cancel_rx: cancel_rx.clone(),
                };
                tokio::spawn(attempt.run())
            })
            .collect();

        // every attempt settles before a decision is made
        let outcomes = join_all(handles).await;

        let mut rows = Vec::with_capacity(outcomes.len());
        let mut shards = Vec::new();
        for (server, outcome) in self.horcruxes.servers.iter().zip(outcomes) {
            let status = match outcome {
                Ok(Ok(shard)) => {
                    shards.push(shard);
                    AttemptStatus::Ok
                }
                Ok(Err(status)) => status,
                Err(e) => {
                    warn!(name = %server.state.name(), error = %e, "attempt task failed");
                    AttemptStatus::MissingShard
                }
            };
            rows.push(AttemptReport {
                name: server.state.name().to_string(),
                status,
            });
        }
        let report = Report { rows };

        if report.failures() > self.horcruxes.fault_tolerance() || shards.len() < threshold {
            warn!(
                recovered = shards.len(),
                threshold,
                "not enough shards to recompose"
            );
            return Err(Error::InsufficientShards(report));
        }

        let secret = tss::combine(&shards, self.encoding)?;
        info!(recovered = shards.len(), threshold, "master secret recomposed");
        Ok((secret, report))
    }
}

/// one holder's attempt, owned by its own task
struct Attempt<T> {
    server: HorcruxServer,
    transport: Arc<T>,
    timeout: Duration,
    threshold: usize,
    reached: Arc<AtomicUsize>,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

impl<T: Transport + 'static> Attempt<T> {
    async fn run(mut self) -> std::result::Result<String, AttemptStatus> {
        let name = self.server.state.name().to_string();

        let cancelled = *self.cancel_rx.borrow();
        if cancelled {
            debug!(%name, "cancelled before sending");
            return Err(AttemptStatus::Cancelled);
        }

        let exchange = tokio::time::timeout(self.timeout, exchange(&self.server, &*self.transport));
        let result = tokio::select! {
            biased;
            outcome = exchange => match outcome {
                Ok(Ok(shard)) => Ok(shard),
                Ok(Err(e)) => Err(AttemptStatus::Error(e)),
                Err(_) => Err(AttemptStatus::Error(Error::Timeout)),
            },
            _ = self.cancel_rx.wait_for(|cancelled| *cancelled) => Err(AttemptStatus::Cancelled),
        };

        match &result {
            Ok(_) => {
                let reached = self.reached.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(%name, reached, threshold = self.threshold, "shard recovered");
                if reached >= self.threshold {
                    self.cancel_tx.send_replace(true);
                }
            }
            Err(AttemptStatus::Cancelled) => debug!(%name, "cancelled, enough shards collected"),
            Err(status) => warn!(%name, %status, "attempt failed"),
        }
        result
    }
}

/// request → send → verify
async fn exchange<T: Transport + ?Sized>(server: &HorcruxServer, transport: &T) -> Result<String> {
    let (params, keypair) = generate_request(&server.state)?;
    let response = transport.send(&server.url, &params).await?;
    verify_response(&response, &server.state, &keypair)
}
