//! Deserialization of small ledger integers, e.g. identifiers and timestamps,
//! given either as decimal strings or as JSON numbers, and of the optional
//! JSON-RPC quantities found in receipts.
use std::fmt::Formatter;

use serde::{
    Deserializer,
    de::{Error, Unexpected, Visitor},
};

pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct UintVisitor();
    impl Visitor<'_> for UintVisitor {
        type Value = u64;

        fn expecting(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("\"<u64>\"")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            parse_decimal(v).ok_or_else(|| E::invalid_value(Unexpected::Str(v), &self))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(v)
        }
    }

    deserializer.deserialize_any(UintVisitor())
}

/// An optional quantity, as a `0x` hex string, a decimal string or a JSON number.
pub(crate) fn deserialize_quantity<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct QuantityVisitor();
    impl<'de> Visitor<'de> for QuantityVisitor {
        type Value = Option<u64>;

        fn expecting(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a quantity, \"0x<hex>\", \"<u64>\" or <u64>")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            parse_quantity(v)
                .map(Some)
                .ok_or_else(|| E::invalid_value(Unexpected::Str(v), &self))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(Some(v))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(None)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(QuantityVisitor())
}

/// An optional flag, as a JSON boolean or as the quantity 0 or 1.
pub(crate) fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    struct FlagVisitor();
    impl FlagVisitor {
        fn decode<E>(&self, quantity: u64, unexpected: Unexpected<'_>) -> Result<bool, E>
        where
            E: Error,
        {
            match quantity {
                0 => Ok(false),
                1 => Ok(true),
                _ => Err(E::invalid_value(unexpected, self)),
            }
        }
    }

    impl<'de> Visitor<'de> for FlagVisitor {
        type Value = Option<bool>;

        fn expecting(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a boolean or the quantity 0 or 1")
        }

        fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(Some(v))
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            parse_quantity(v)
                .ok_or_else(|| E::invalid_value(Unexpected::Str(v), &self))
                .and_then(|quantity| self.decode(quantity, Unexpected::Str(v)))
                .map(Some)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            self.decode(v, Unexpected::Unsigned(v)).map(Some)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(None)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(FlagVisitor())
}

fn parse_decimal(v: &str) -> Option<u64> {
    Some(v)
        .filter(|v| !v.is_empty() && v.bytes().all(|byte| byte.is_ascii_digit()))
        .and_then(|v| v.parse().ok())
}

fn parse_quantity(v: &str) -> Option<u64> {
    match v.strip_prefix("0x") {
        Some(hex) => Some(hex)
            .filter(|hex| !hex.is_empty() && hex.bytes().all(|byte| byte.is_ascii_hexdigit()))
            .and_then(|hex| u64::from_str_radix(hex, 16).ok()),
        None => parse_decimal(v),
    }
}
