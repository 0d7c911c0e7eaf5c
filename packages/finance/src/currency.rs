use std::fmt::Debug;

pub type SymbolStatic = &'static str;

pub trait Currency: Copy + Ord + Default + Debug + 'static {
    const TICKER: SymbolStatic;

    /// Number of fractional decimal digits between the display unit
    /// and the smallest unit the ledger accounts in.
    const DECIMAL_DIGITS: u8;
}

/// The ledger's native currency, accounted in its smallest unit (wei).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct Native;

impl Currency for Native {
    const TICKER: SymbolStatic = "ETH";

    const DECIMAL_DIGITS: u8 = 18;
}
