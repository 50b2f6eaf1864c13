//! PServ Core - Shared error types

mod error;

pub use error::*;
