//! Ordered transport fallback.

use std::sync::Arc;

use async_trait::async_trait;

use gimptrack_core::error::{Result, TrackerError};

use crate::transport::{Connector, Endpoint, Link};

/// Tries each connector in order and returns the first link that opens.
///
/// Credential and endpoint failures stop the chain: another transport would
/// be rejected for the same reason.
pub struct FallbackConnector {
    chain: Vec<Arc<dyn Connector>>,
}

impl FallbackConnector {
    pub fn new(chain: Vec<Arc<dyn Connector>>) -> Self {
        Self { chain }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.chain.iter().map(|c| c.name()).collect()
    }
}

#[async_trait]
impl Connector for FallbackConnector {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn open(&self, endpoint: &Endpoint, credential: &str) -> Result<Box<dyn Link>> {
        let mut last = None;
        for connector in &self.chain {
            match connector.open(endpoint, credential).await {
                Ok(link) => {
                    tracing::info!(transport = connector.name(), endpoint = endpoint.as_str(), "transport opened");
                    return Ok(link);
                }
                Err(e @ (TrackerError::AuthFailed | TrackerError::BadUrl(_))) => return Err(e),
                Err(e) => {
                    tracing::warn!(transport = connector.name(), error = %e, "transport failed, trying next");
                    last = Some(e);
                }
            }
        }
        Err(last.unwrap_or_else(|| TrackerError::Internal("no transports configured".into())))
    }
}
