pub use self::{
    collection::LoanCollection,
    repository::{LoanRepository, Pinned},
};

mod collection;
mod repository;
