//! (De-)serialization of Amount as a decimal String since the ledger and
//! JSON clients exchange `uint256` values as text.
//! Plain JSON numbers are accepted on input as long as they fit in `u64`.
use std::fmt::Formatter;

use serde::{
    Deserializer, Serializer,
    de::{Error, Unexpected, Visitor},
};

use crate::coin::Amount;

pub(super) fn serialize<S>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&amount.to_string())
}

pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Amount, D::Error>
where
    D: Deserializer<'de>,
{
    struct AmountVisitor();
    impl Visitor<'_> for AmountVisitor {
        type Value = Amount;

        fn expecting(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("\"<uint256>\"")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            super::display::parse_digits(v)
                .ok_or_else(|| E::invalid_value(Unexpected::Str(v), &self))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(Amount::from(v))
        }
    }

    deserializer.deserialize_any(AmountVisitor())
}
