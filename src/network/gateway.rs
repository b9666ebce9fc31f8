//! Gateway - TCP listener the platform bridge connects to.
//!
//! One bridge is served at a time. When its session ends the gateway goes
//! back to accepting; the target store outlives every session.

use super::session::{self, SessionParams};
use crate::config::Config;
use crate::handlers::NotifySettings;
use crate::state::TargetStore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn, Instrument};

/// Back-off after a failed accept, so a persistent error doesn't spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(250);

pub struct Gateway {
    listener: TcpListener,
    params: SessionParams,
}

impl Gateway {
    /// Bind the bridge listener.
    pub async fn bind(config: &Config, store: Arc<TargetStore>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.bridge.listen).await?;
        info!(addr = %listener.local_addr()?, "Bridge listener bound");

        Ok(Self {
            listener,
            params: SessionParams {
                store,
                notify: NotifySettings::from(&config.notify),
                send_timeout: config.bridge.send_timeout(),
                max_frame_len: config.bridge.max_frame_len,
                handshake_timeout: config.bridge.handshake_timeout(),
            },
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept bridge connections forever.
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(error = %e, "Failed to accept bridge connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            if let Err(e) = stream.set_nodelay(true) {
                warn!(%addr, error = %e, "Failed to set TCP_NODELAY");
            }
            info!(%addr, "Bridge connected");

            let span = crate::telemetry::spans::bridge(&addr);
            match session::run(stream, &self.params).instrument(span).await {
                Ok(()) => info!(%addr, "Bridge disconnected"),
                Err(e) => warn!(%addr, error = %e, "Bridge session ended with error"),
            }
        }
    }
}
