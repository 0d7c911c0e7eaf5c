use std::fmt::{Display, Formatter, Result as FmtResult};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{address::Address, msg::QueryMsg, transaction::TransactionRequest};

/// Opaque identity of the network the provider is connected to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChainId(String);

impl ChainId {
    pub fn new<S>(id: S) -> Self
    where
        S: Into<String>,
    {
        Self(id.into())
    }
}

impl Display for ChainId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Out-of-band changes reported by the wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(ChainId),
}

/// A failure reported by the provider, with an EIP-1193 style code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[Provider] {message} (code {code})")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const DISCONNECTED: i64 = 4900;
    pub const CHAIN_DISCONNECTED: i64 = 4901;
    pub const INTERNAL: i64 = -32603;

    pub fn new<M>(code: i64, message: M) -> Self
    where
        M: Into<String>,
    {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn user_rejected<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self::new(Self::USER_REJECTED, message)
    }

    pub fn internal<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self::new(Self::INTERNAL, message)
    }

    pub const fn is_user_rejected(&self) -> bool {
        self.code == Self::USER_REJECTED
    }
}

/// The wallet and ledger node as the client sees them.
///
/// Implementations own ABI encoding, signing and transport.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    async fn chain_id(&self) -> Result<ChainId, ProviderError>;

    /// Execute a read-only contract method and return its decoded outputs.
    async fn call(&self, contract: Address, msg: &QueryMsg) -> Result<Value, ProviderError>;

    /// Sign and submit a transaction, resolving to its receipt once the ledger accepts it.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<Value, ProviderError>;

    /// Register for account and chain notifications.
    fn subscribe(&self) -> UnboundedReceiver<ProviderEvent>;
}
