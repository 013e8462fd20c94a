use std::time::Duration;

use futures::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// A best-bid/best-ask tick observed from the streaming order-book feed.
#[derive(Clone, Copy, Debug)]
pub struct BestQuote {
    pub symbol_index: usize,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
}

#[derive(Deserialize)]
struct QuoteWire {
    bid: Option<String>,
    ask: Option<String>,
}

/// Streaming order-book client for the Starknet perpetual venue. Runs an
/// infinite reconnect loop on whichever executor thread it's spawned on;
/// a dropped connection is reported but never tears down the caller's
/// loop. Grounded on the teacher's `OmnistonWsClient::request_for_quote_stream`
/// reconnect-on-error pattern.
pub struct StreamingClient {
    url: String,
}

impl StreamingClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Subscribes to best-bid/ask updates for `symbol`, forwarding parsed
    /// quotes to `tx` until the channel closes. Reconnects with a 3s
    /// backoff on any connection error; never returns on its own.
    pub async fn stream_best_quote(&self, symbol: String, symbol_index: usize, tx: mpsc::Sender<BestQuote>) {
        loop {
            match connect_async(&self.url).await {
                Ok((mut ws, _)) => {
                    let sub = serde_json::json!({ "op": "subscribe", "channel": "book", "symbol": symbol });
                    if ws.send(Message::Text(sub.to_string().into())).await.is_err() {
                        tokio::time::sleep(Duration::from_secs(3)).await;
                        continue;
                    }

                    while let Some(msg) = ws.next().await {
                        let Ok(Message::Text(text)) = msg else { continue };
                        let Ok(wire) = serde_json::from_str::<QuoteWire>(&text) else {
                            continue;
                        };

                        let quote = BestQuote {
                            symbol_index,
                            bid: wire.bid.and_then(|s| s.parse().ok()),
                            ask: wire.ask.and_then(|s| s.parse().ok()),
                        };

                        if tx.send(quote).await.is_err() {
                            return; // receiver gone; stop the loop entirely
                        }
                    }

                    tracing::warn!(symbol = %symbol, "order-book stream closed; reconnecting");
                }
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "order-book stream connect failed; retrying");
                }
            }

            tokio::time::sleep(Duration::from_secs(3)).await;
        }
    }
}
