use std::fmt::Display;

/// Build a logger of a failed operation, to be passed to `Result::inspect_err`.
///
/// Failures are never meant to be swallowed, so the closure only records the error
/// and leaves its propagation to the caller.
pub fn log<Err>(operation: &'static str) -> impl FnOnce(&Err)
where
    Err: Display,
{
    move |err| tracing::warn!(operation, error = %err, "operation failed")
}
