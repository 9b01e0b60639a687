//! Minting protocol domain types.
//!
//! Identities, fixed-point helpers, tier tables, the global ledger, per-collection
//! configuration, fee splits and pending requests. Everything here is pure data plus
//! invariant checks; staging and side effects live in the execution crate.

mod collection;
mod constants;
mod error;
mod fees;
mod fixed;
mod identity;
mod ledger;
mod request;
mod tier;

pub use collection::*;
pub use constants::*;
pub use error::*;
pub use fees::*;
pub use fixed::*;
pub use identity::*;
pub use ledger::*;
pub use request::*;
pub use tier::*;
