pub use self::stub::{LedgerGateway, LedgerStub};

pub mod address;
pub mod config;
pub mod error;
pub mod loan;
pub mod msg;
pub mod operation;
pub mod provider;
mod stub;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transaction;
mod uint_serde;
