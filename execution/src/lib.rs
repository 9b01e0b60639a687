//! Luckymint execution layer.
//!
//! This crate contains the deterministic request, resolution and settlement logic
//! ([`Layer`]) and the collaborator traits it drives.
//!
//! ## Two phases
//! - [`Layer::execute`] validates a batch, charges it, asks the randomness gateway for
//!   words and records a pending request.
//! - [`Layer::fulfill`] is invoked later with the delivered words. It resolves the batch
//!   through [`resolver::resolve`] and settles the outcome.
//!
//! Each phase runs in its own `Layer`. Nothing reaches durable state until the caller
//! applies [`Layer::commit`], so a failed phase leaves no partial charge and no orphaned
//! pending request.
//!
//! ## Determinism requirements
//! - Do not use wall-clock time inside execution.
//! - Only the delivered random words may influence outcomes.
//! - Avoid iteration order of hash-based collections influencing outputs.

use luckymint_types::mint::MintError;
use thiserror::Error as ThisError;

pub mod externals;
pub mod randomness;
pub mod resolver;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

mod layer;
mod state;


pub use externals::{
    ConsolationToken, ExternalError, Externals, NativeBank, RandomnessGateway, ReceiptLedger,
    YieldSource,
};
pub use layer::Layer;
pub use state::{collection, ledger, pending_request, tiers, State, Status};

#[cfg(any(test, feature = "mocks"))]
pub use state::Memory;

#[derive(Debug, ThisError)]
pub enum ExecutionError {
    #[error(transparent)]
    Mint(#[from] MintError),
    #[error("collaborator failed: {0}")]
    External(#[from] ExternalError),
    #[error("state error: {0}")]
    State(#[from] anyhow::Error),
}

impl ExecutionError {
    /// The protocol error, if this failure was one.
    pub fn mint_error(&self) -> Option<&MintError> {
        match self {
            Self::Mint(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T, E = ExecutionError> = std::result::Result<T, E>;
