pub mod emit;
pub mod error;
pub mod message;
