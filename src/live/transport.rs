use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::LiveError;
use super::messages::{ClientMessage, ServerMessage};

const DRIVER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Opens the duplex stream to the live model
///
/// `connect` sends `setup` and returns once the server acknowledged it.
#[async_trait::async_trait]
pub trait LiveConnector: Send + Sync {
    async fn connect(&self, setup: ClientMessage) -> Result<LiveLink, LiveError>;
}

/// Session-side end of an established stream
pub struct LiveLink {
    outbound: mpsc::Sender<ClientMessage>,
    inbound: mpsc::Receiver<Result<ServerMessage, LiveError>>,
    shutdown: CancellationToken,
    driver: Option<JoinHandle<()>>,
}

/// Transport-side end of a `LiveLink`
pub struct LinkPeer {
    /// Messages the session wants sent
    pub outbound: mpsc::Receiver<ClientMessage>,
    /// Messages (or the terminal error) delivered to the session
    pub inbound: mpsc::Sender<Result<ServerMessage, LiveError>>,
    /// Cancelled when the session closes the link
    pub shutdown: CancellationToken,
}

impl LiveLink {
    /// Connected pair of channels with `buffer` slots each way
    pub fn pair(buffer: usize) -> (LiveLink, LinkPeer) {
        let (outbound_tx, outbound_rx) = mpsc::channel(buffer);
        let (inbound_tx, inbound_rx) = mpsc::channel(buffer);
        let shutdown = CancellationToken::new();

        let link = LiveLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
            shutdown: shutdown.clone(),
            driver: None,
        };
        let peer = LinkPeer {
            outbound: outbound_rx,
            inbound: inbound_tx,
            shutdown,
        };
        (link, peer)
    }

    /// Attach the task that pumps the peer end; awaited on close
    pub fn with_driver(mut self, driver: JoinHandle<()>) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn sender(&self) -> mpsc::Sender<ClientMessage> {
        self.outbound.clone()
    }

    pub async fn recv(&mut self) -> Option<Result<ServerMessage, LiveError>> {
        self.inbound.recv().await
    }

    /// Signal the transport to close and wait for its driver to finish
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.shutdown.cancel();
        self.inbound.close();

        if let Some(mut driver) = self.driver.take() {
            match tokio::time::timeout(DRIVER_SHUTDOWN_TIMEOUT, &mut driver).await {
                Ok(Ok(())) => debug!("Live transport closed"),
                Ok(Err(e)) => anyhow::bail!("Live transport task failed: {}", e),
                Err(_) => {
                    warn!("Live transport did not close in time, aborting");
                    driver.abort();
                }
            }
        }
        Ok(())
    }
}

impl Drop for LiveLink {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
