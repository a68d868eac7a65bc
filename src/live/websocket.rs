use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::error::LiveError;
use super::messages::{ClientMessage, ServerMessage};
use super::transport::{LinkPeer, LiveConnector, LiveLink};

pub const DEFAULT_LIVE_ENDPOINT: &str =
    "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

const LINK_BUFFER: usize = 64;

/// Connects to the Gemini Live `BidiGenerateContent` WebSocket
#[derive(Debug, Clone)]
pub struct GeminiLiveConnector {
    endpoint: String,
    api_key: String,
    setup_timeout: Duration,
}

impl GeminiLiveConnector {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            setup_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_setup_timeout(mut self, timeout: Duration) -> Self {
        self.setup_timeout = timeout;
        self
    }

    fn url(&self) -> String {
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        format!("{}{}key={}", self.endpoint, separator, self.api_key)
    }
}

#[async_trait::async_trait]
impl LiveConnector for GeminiLiveConnector {
    async fn connect(&self, setup: ClientMessage) -> Result<LiveLink, LiveError> {
        info!("Connecting to live endpoint: {}", self.endpoint);

        let (socket, _response) = tokio_tungstenite::connect_async(self.url())
            .await
            .map_err(|e| LiveError::Handshake(format!("connect failed: {}", e)))?;
        let (mut write, mut read) = socket.split();

        let setup_json = setup.to_json()?;
        debug!("Sending setup ({} bytes)", setup_json.len());
        write
            .send(Message::Text(setup_json))
            .await
            .map_err(|e| LiveError::Handshake(format!("setup send failed: {}", e)))?;

        let acknowledged = tokio::time::timeout(self.setup_timeout, async {
            while let Some(frame) = read.next().await {
                let message = match frame {
                    Ok(Message::Text(text)) => ServerMessage::parse(&text),
                    Ok(Message::Binary(bytes)) => ServerMessage::parse_bytes(&bytes),
                    Ok(Message::Close(frame)) => {
                        let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
                        return Err(LiveError::Handshake(format!("closed during setup: {}", reason)));
                    }
                    Ok(_) => continue,
                    Err(e) => return Err(LiveError::Handshake(e.to_string())),
                };

                match message {
                    Ok(message) if message.is_setup_complete() => return Ok(()),
                    Ok(_) => debug!("Ignoring message before setup completed"),
                    Err(e) => warn!("Unreadable message during setup: {}", e),
                }
            }
            Err(LiveError::Handshake("stream ended during setup".to_string()))
        })
        .await;

        match acknowledged {
            Ok(Ok(())) => info!("Live setup complete"),
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(LiveError::Handshake(format!(
                    "no setup acknowledgement within {:?}",
                    self.setup_timeout
                )))
            }
        }

        let (link, peer) = LiveLink::pair(LINK_BUFFER);
        let driver = tokio::spawn(drive(write, read, peer));
        Ok(link.with_driver(driver))
    }
}

/// Pump messages between the socket and the session until either side closes
async fn drive<W, R>(mut write: W, mut read: R, mut peer: LinkPeer)
where
    W: futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    R: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        tokio::select! {
            biased;

            _ = peer.shutdown.cancelled() => {
                debug!("Closing live socket");
                if let Err(e) = write.send(Message::Close(None)).await {
                    debug!("Close frame not sent: {}", e);
                }
                break;
            }

            outgoing = peer.outbound.recv() => {
                let Some(message) = outgoing else {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                };
                let json = match message.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Dropping unserializable message: {}", e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(json)).await {
                    let _ = peer.inbound.send(Err(LiveError::Stream(e.to_string()))).await;
                    break;
                }
            }

            incoming = read.next() => {
                let delivered = match incoming {
                    Some(Ok(Message::Text(text))) => ServerMessage::parse(&text),
                    Some(Ok(Message::Binary(bytes))) => ServerMessage::parse_bytes(&bytes),
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty());
                        info!("Live socket closed by server");
                        let _ = peer.inbound.send(Err(LiveError::StreamClosed(reason))).await;
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        let _ = peer.inbound.send(Err(LiveError::Stream(e.to_string()))).await;
                        break;
                    }
                    None => {
                        let _ = peer.inbound.send(Err(LiveError::StreamClosed(None))).await;
                        break;
                    }
                };

                if peer.inbound.send(delivered).await.is_err() {
                    debug!("Session no longer listening");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_appends_key() {
        let connector = GeminiLiveConnector::new(DEFAULT_LIVE_ENDPOINT, "k123");
        assert!(connector.url().ends_with("BidiGenerateContent?key=k123"));

        let connector = GeminiLiveConnector::new("wss://example.test/ws?alt=json", "k");
        assert_eq!(connector.url(), "wss://example.test/ws?alt=json&key=k");
    }
}
