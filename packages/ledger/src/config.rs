use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::{address::Address, transaction::Gas};

const DEFAULT_GAS_LIMIT: Gas = 300_000;
const DEFAULT_READ_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_SUBMISSION_TIMEOUT_MS: u64 = 300_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    contract: Address,
    #[serde(default = "default_gas_limit")]
    gas_limit: Gas,
    #[serde(default = "default_read_timeout_ms")]
    read_timeout_ms: u64,
    #[serde(default = "default_submission_timeout_ms")]
    submission_timeout_ms: u64,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("[Ledger] [Config] Deserialization error occurred! Context: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("[Ledger] [Config] Invalid value of '{0}'! It must be positive")]
    Zero(&'static str),
}

impl Config {
    pub const fn new(contract: Address) -> Self {
        Self {
            contract,
            gas_limit: DEFAULT_GAS_LIMIT,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            submission_timeout_ms: DEFAULT_SUBMISSION_TIMEOUT_MS,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str::<Self>(json)
            .map_err(Into::into)
            .and_then(Self::validate)
    }

    pub const fn with_gas_limit(self, gas_limit: Gas) -> Self {
        Self { gas_limit, ..self }
    }

    pub fn with_read_timeout(self, timeout: Duration) -> Self {
        Self {
            read_timeout_ms: millis(timeout),
            ..self
        }
    }

    pub fn with_submission_timeout(self, timeout: Duration) -> Self {
        Self {
            submission_timeout_ms: millis(timeout),
            ..self
        }
    }

    pub const fn contract(&self) -> Address {
        self.contract
    }

    pub const fn gas_limit(&self) -> Gas {
        self.gas_limit
    }

    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub const fn submission_timeout(&self) -> Duration {
        Duration::from_millis(self.submission_timeout_ms)
    }

    fn validate(self) -> Result<Self, Error> {
        if self.gas_limit == 0 {
            Err(Error::Zero("gas-limit"))
        } else if self.read_timeout_ms == 0 {
            Err(Error::Zero("read-timeout-ms"))
        } else if self.submission_timeout_ms == 0 {
            Err(Error::Zero("submission-timeout-ms"))
        } else {
            Ok(self)
        }
    }
}

fn millis(timeout: Duration) -> u64 {
    timeout.as_millis().try_into().unwrap_or(u64::MAX)
}

const fn default_gas_limit() -> Gas {
    DEFAULT_GAS_LIMIT
}

const fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}

const fn default_submission_timeout_ms() -> u64 {
    DEFAULT_SUBMISSION_TIMEOUT_MS
}
