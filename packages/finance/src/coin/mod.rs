use std::{
    any,
    cmp::Ordering,
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    marker::PhantomData,
};

use bnum::types::U256;
use serde::{Deserialize, Serialize};

use crate::{currency::Currency, zero::Zero};

mod amount_serde;
mod display;

/// Amounts are accounted in the ledger's smallest unit and span the full
/// range of its `uint256` values.
pub type Amount = U256;

#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coin<C> {
    #[serde(with = "amount_serde")]
    amount: Amount,
    #[serde(skip)]
    currency: PhantomData<C>,
}

impl<C> Coin<C> {
    pub const fn new(amount: Amount) -> Self {
        Self {
            amount,
            currency: PhantomData,
        }
    }

    pub const fn amount(&self) -> Amount {
        self.amount
    }

    pub fn is_zero(&self) -> bool {
        self.amount == Amount::ZERO
    }
}

impl<C> Clone for Coin<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Coin<C> {}

impl<C> Debug for Coin<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coin")
            .field("amount", &self.amount)
            .field("ticker", &any::type_name::<C>())
            .finish()
    }
}

impl<C> Default for Coin<C> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<C> Display for Coin<C>
where
    C: Currency,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{} {}", self.to_display(), C::TICKER))
    }
}

impl<C> Eq for Coin<C> {}

impl<C> From<u128> for Coin<C> {
    fn from(amount: u128) -> Self {
        Self::new(amount.into())
    }
}

impl<C> Hash for Coin<C> {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.amount.hash(state)
    }
}

impl<C> Ord for Coin<C> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.amount.cmp(&other.amount)
    }
}

impl<C> PartialEq for Coin<C> {
    fn eq(&self, other: &Self) -> bool {
        self.amount == other.amount
    }
}

impl<C> PartialOrd for Coin<C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<C> Zero for Coin<C> {
    const ZERO: Self = Self::new(Amount::ZERO);
}
