use serde::{Deserialize, Serialize};

use crate::{address::Address, loan::Funds, msg::ExecuteMsg, uint_serde};

pub type Gas = u64;

/// A state-changing call handed over to the provider for signing and submission.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Funds>,
    pub gas_limit: Gas,
    pub call: ExecuteMsg,
}

/// Confirmation of a transaction accepted by the ledger.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: String,
    #[serde(
        default,
        deserialize_with = "uint_serde::deserialize_quantity",
        skip_serializing_if = "Option::is_none"
    )]
    pub block_number: Option<u64>,
    /// Execution outcome, absent on ledgers predating status reporting.
    #[serde(
        default,
        deserialize_with = "uint_serde::deserialize_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<bool>,
}

impl Receipt {
    pub fn reverted(&self) -> bool {
        self.status == Some(false)
    }
}
