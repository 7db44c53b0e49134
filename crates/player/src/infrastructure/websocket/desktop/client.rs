//! Desktop WebSocket transport using tokio-tungstenite

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::ports::outbound::{
    TransportChannel, TransportConnector, TransportError, TransportEvent, TransportSink,
};

/// Opens real websocket connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self
    }
}

enum Outgoing {
    Frame(String),
    Close,
}

#[async_trait]
impl TransportConnector for TungsteniteConnector {
    async fn open(
        &self,
        url: &str,
        sink: TransportSink,
    ) -> Result<Box<dyn TransportChannel>, TransportError> {
        let (ws_stream, _) = connect_async(url).await.map_err(|e| TransportError::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        tracing::info!(url, epoch = %sink.epoch(), "WebSocket handshake complete");

        let (mut write, mut read) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Outgoing>();

        let reader = tokio::spawn(async move {
            let closed = loop {
                match read.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if !sink.emit(TransportEvent::Frame(text)) {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(epoch = %sink.epoch(), "Server closed connection");
                        break match frame {
                            Some(frame) => TransportEvent::Closed {
                                code: Some(u16::from(frame.code)),
                                reason: frame.reason.into_owned(),
                                was_clean: true,
                            },
                            None => TransportEvent::Closed {
                                code: None,
                                reason: String::new(),
                                was_clean: true,
                            },
                        };
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!(epoch = %sink.epoch(), error = %e, "WebSocket error");
                        sink.emit(TransportEvent::Error(e.to_string()));
                        break TransportEvent::Closed {
                            code: None,
                            reason: e.to_string(),
                            was_clean: false,
                        };
                    }
                    None => {
                        break TransportEvent::Closed {
                            code: None,
                            reason: String::new(),
                            was_clean: false,
                        }
                    }
                }
            };
            sink.emit(closed);
        });

        tokio::spawn(async move {
            while let Some(outgoing) = rx.recv().await {
                match outgoing {
                    Outgoing::Frame(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            tracing::error!(error = %e, "Failed to send message");
                            break;
                        }
                    }
                    Outgoing::Close => {
                        if let Err(e) = write.send(Message::Close(None)).await {
                            tracing::debug!(error = %e, "Close frame not delivered");
                        }
                        break;
                    }
                }
            }
        });

        Ok(Box::new(TungsteniteChannel { tx, reader }))
    }
}

/// Handle to one open websocket.
///
/// Frames are queued to a writer task; the reader task reports inbound frames
/// and closure through the [`TransportSink`] it was opened with.
pub struct TungsteniteChannel {
    tx: mpsc::UnboundedSender<Outgoing>,
    reader: JoinHandle<()>,
}

impl TransportChannel for TungsteniteChannel {
    fn send(&self, frame: String) -> Result<(), TransportError> {
        self.tx
            .send(Outgoing::Frame(frame))
            .map_err(|_| TransportError::NotConnected)
    }

    fn close(&self) {
        // The writer may already be gone; either way the socket is finished.
        let _ = self.tx.send(Outgoing::Close);
        self.reader.abort();
    }
}

impl Drop for TungsteniteChannel {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::outbound::ConnectionEpoch;

    #[tokio::test]
    async fn test_open_unreachable_host_fails() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let sink = TransportSink::new(ConnectionEpoch::new(1), tx);
        let result = TungsteniteConnector::new()
            .open("ws://127.0.0.1:1", sink)
            .await;
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[tokio::test]
    async fn test_send_after_writer_gone_is_not_connected() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let channel = TungsteniteChannel {
            tx,
            reader: tokio::spawn(async {}),
        };
        assert_eq!(
            channel.send("{}".into()),
            Err(TransportError::NotConnected)
        );
    }
}
