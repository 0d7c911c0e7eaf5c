use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("[Finance] Invalid amount '{input}', cause '{cause}'")]
    InvalidAmount { input: String, cause: &'static str },

    #[error(
        "[Finance] Amount '{input}' has more than {max_digits} fractional digits and cannot be represented exactly"
    )]
    Precision { input: String, max_digits: u8 },

    #[error("[Finance] Amount '{0}' does not fit in 256 bits")]
    Overflow(String),
}

impl Error {
    pub(crate) fn invalid_amount<S>(input: S, cause: &'static str) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidAmount {
            input: input.into(),
            cause,
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
