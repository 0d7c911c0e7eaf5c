use std::fmt::{Display, Formatter, Result as FmtResult};

use ledger::{address::Address, provider::ChainId};

/// The account acting on the ledger and the network it lives on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    account: Address,
    chain: ChainId,
}

impl Identity {
    pub const fn new(account: Address, chain: ChainId) -> Self {
        Self { account, chain }
    }

    pub const fn account(&self) -> Address {
        self.account
    }

    pub const fn chain(&self) -> &ChainId {
        &self.chain
    }

    pub(crate) fn switch_account(self, account: Address) -> Self {
        Self { account, ..self }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(Identity),
    /// The wallet stopped exposing an account. The last loans stay visible.
    ConnectionLost,
}

impl SessionState {
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Connected(identity) => Some(identity),
            Self::Disconnected | Self::Connecting | Self::ConnectionLost => None,
        }
    }

    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    /// Whether a fresh handshake may start from here.
    pub const fn may_connect(&self) -> bool {
        matches!(self, Self::Disconnected | Self::ConnectionLost)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected(_) => "connected",
            Self::ConnectionLost => "connection-lost",
        }
    }
}

impl Display for SessionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}
