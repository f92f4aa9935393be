use async_trait::async_trait;
use log::info;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Debug;

use crate::{
    error::TransportError,
    model::{ChartContract, ChartQuery},
};

/// The remote birth chart computation, consumed as request/response.
#[async_trait]
pub trait ChartService: Send + Sync + Debug {
    async fn fetch_chart(&self, query: &ChartQuery) -> Result<Value, TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpChartService {
    endpoint: String,
    contract: ChartContract,
    http: Client,
}

impl HttpChartService {
    pub fn new(base_url: &str, contract: ChartContract) -> Self {
        Self {
            endpoint: format!("{}/birth_chart", base_url.trim_end_matches('/')),
            contract,
            http: Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn contract(&self) -> ChartContract {
        self.contract
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Map a finished HTTP exchange onto the chart outcome: a 2xx JSON body is
/// returned untouched, anything else becomes a [`TransportError`].
pub fn outcome_from_response(status: StatusCode, body: &str) -> Result<Value, TransportError> {
    if status.is_success() {
        return serde_json::from_str(body).map_err(|e| TransportError::InvalidBody(e.to_string()));
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty());

    Err(TransportError::Status { status: status.as_u16(), message })
}

#[async_trait]
impl ChartService for HttpChartService {
    async fn fetch_chart(&self, query: &ChartQuery) -> Result<Value, TransportError> {
        info!("requesting birth chart from {} ({})", self.endpoint, self.contract);

        let res = self
            .http
            .get(&self.endpoint)
            .query(&query.pairs(self.contract))
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| TransportError::Network(e.to_string()))?;

        outcome_from_response(status, &body)
    }
}
