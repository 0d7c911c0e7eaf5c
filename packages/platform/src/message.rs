use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::Serialize;

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    #[default]
    Info,
    Error,
}

/// A user-facing outcome of an operation, e.g. a loan was funded or a transaction failed.
///
/// Built through [`Emitter`](crate::emit::Emitter).
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    level: Level,
    event: String,
    attributes: Vec<(String, String)>,
}

impl Message {
    pub(crate) fn new(level: Level, event: String) -> Self {
        Self {
            level,
            event,
            attributes: vec![],
        }
    }

    pub(crate) fn add_attribute(mut self, key: String, value: String) -> Self {
        self.attributes.push((key, value));

        self
    }

    pub const fn level(&self) -> Level {
        self.level
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attr_key, _)| attr_key == key)
            .map(|(_, value)| value.as_str())
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.event)?;

        self.attributes
            .iter()
            .enumerate()
            .try_for_each(|(index, (key, value))| {
                let separator = if index == 0 { ": " } else { ", " };

                write!(f, "{separator}{key}={value}")
            })
    }
}
