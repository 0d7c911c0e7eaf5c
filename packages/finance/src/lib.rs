pub mod coin;
pub mod currency;
pub mod error;
pub mod zero;
