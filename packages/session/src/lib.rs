pub use self::{
    controller::SessionController,
    input::LoanForm,
    state::{Identity, SessionState},
};

mod controller;
pub mod error;
mod input;
mod state;
