//! Balance oracle: account id → token balance.

use async_trait::async_trait;
use serde_json::json;

use crate::config::OracleConfig;

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("no token mint configured (set BLANK_TOKEN_MINT)")]
    NotConfigured,

    #[error("RPC request failed: {0}")]
    Network(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("unreadable RPC response: {0}")]
    Parse(String),
}

impl From<OracleError> for blank_core::Error {
    fn from(e: OracleError) -> Self {
        blank_core::Error::OracleUnavailable(e.to_string())
    }
}

#[async_trait]
pub trait BalanceOracle: Send + Sync {
    /// Non-negative balance held by `account`.
    async fn balance_of(&self, account: &str) -> Result<f64, OracleError>;
}

/// Reads SPL token balances with `getTokenAccountsByOwner`.
pub struct SolanaOracle {
    config: OracleConfig,
    client: reqwest::Client,
}

impl SolanaOracle {
    pub fn new(config: OracleConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

fn rpc_body(account: &str, mint: &str) -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "getTokenAccountsByOwner",
        "params": [account, { "mint": mint }, { "encoding": "jsonParsed" }],
    })
}

/// `uiAmount` of the first token account; no accounts means zero.
fn parse_balance(data: &serde_json::Value) -> Result<f64, OracleError> {
    if let Some(err) = data.get("error") {
        return Err(OracleError::Rpc(err.to_string()));
    }
    let accounts = data
        .pointer("/result/value")
        .and_then(|v| v.as_array())
        .ok_or_else(|| OracleError::Parse("missing result.value".to_string()))?;

    let Some(first) = accounts.first() else {
        return Ok(0.0);
    };
    let amount = first
        .pointer("/account/data/parsed/info/tokenAmount/uiAmount")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    Ok(amount.max(0.0))
}

#[async_trait]
impl BalanceOracle for SolanaOracle {
    async fn balance_of(&self, account: &str) -> Result<f64, OracleError> {
        let mint = self
            .config
            .token_mint
            .as_deref()
            .filter(|m| !m.is_empty())
            .ok_or(OracleError::NotConfigured)?;

        let response = self
            .client
            .post(&self.config.rpc_url)
            .json(&rpc_body(account, mint))
            .send()
            .await
            .map_err(|e| OracleError::Network(e.to_string()))?;

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OracleError::Parse(e.to_string()))?;
        parse_balance(&data)
    }
}
