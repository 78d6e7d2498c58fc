//! Data layer of the agora social network.
//!
//! Entity [`records`] are persisted through the [`Engine`] of `agora-core`,
//! optionally grouped in a [`TransactionManager`]. Clients authenticate with
//! the stateless tokens of [`session`].

extern crate self as agora;

pub mod accounts;
pub mod config;
pub mod records;
pub mod schema;
pub mod session;

pub use agora_core::*;
pub use agora_macros::Record;
pub use records::*;
