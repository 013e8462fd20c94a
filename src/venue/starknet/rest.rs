use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{Depth, DepthLevel};
use crate::error::{Error, Result};

/// Thin REST client for the Starknet perpetual venue's depth snapshot
/// endpoint, used as the fallback leg of the hybrid depth source and as
/// the source of additional levels when the stream only carries best-of-book.
/// Grounded on the teacher's `StonfiClient` (reqwest::Client with pool
/// tuning, `#[instrument]`).
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct DepthLevelWire {
    price: String,
    size: String,
}

#[derive(Deserialize)]
struct DepthWire {
    bids: Vec<DepthLevelWire>,
    asks: Vec<DepthLevelWire>,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .expect("failed to build REST client");

        Self {
            http,
            base_url: base_url.into(),
        }
    }

    #[tracing::instrument(skip(self), fields(symbol, limit))]
    pub async fn fetch_depth(&self, symbol: &str, limit: usize) -> Result<Depth> {
        let url = format!("{}/markets/{symbol}/orderbook?depth={limit}", self.base_url);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Connectivity(e.to_string()))?;

        let wire: DepthWire = resp
            .json()
            .await
            .map_err(|e| Error::Connectivity(format!("malformed depth response: {e}")))?;

        let parse_level = |l: DepthLevelWire| -> Result<DepthLevel> {
            Ok(DepthLevel {
                price: l
                    .price
                    .parse::<Decimal>()
                    .map_err(|e| Error::Connectivity(format!("bad price: {e}")))?,
                size: l
                    .size
                    .parse::<Decimal>()
                    .map_err(|e| Error::Connectivity(format!("bad size: {e}")))?,
            })
        };

        let mut bids = wire
            .bids
            .into_iter()
            .take(limit)
            .map(parse_level)
            .collect::<Result<Vec<_>>>()?;
        let mut asks = wire
            .asks
            .into_iter()
            .take(limit)
            .map(parse_level)
            .collect::<Result<Vec<_>>>()?;

        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));

        Ok(Depth { bids, asks })
    }
}
