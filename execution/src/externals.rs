//! Collaborators the engine drives but does not own.
//!
//! Every call here is an external side effect: it is not staged by the [crate::Layer]
//! and is not rolled back with it. Handlers finish validating and staging their
//! bookkeeping before touching any of these, and unwind earlier calls themselves when a
//! later one fails.

use luckymint_types::mint::{Address, ReceiptId, RequestId};
use thiserror::Error as ThisError;

#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum ExternalError {
    #[error("subscription balance {balance} cannot cover {required}")]
    Underfunded { required: u128, balance: u128 },
    #[error("{requested} words exceeds the per-call limit of {max}")]
    TooManyWords { requested: u32, max: u32 },
    #[error("insufficient balance for {account} (required={required}, available={available})")]
    InsufficientBalance {
        account: Address,
        required: u128,
        available: u128,
    },
    #[error("{0} rejected the transfer")]
    Rejected(Address),
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Source of verifiable random words, delivered later through a fulfilment.
pub trait RandomnessGateway {
    /// Largest number of words a single request may ask for.
    fn max_words(&self) -> u32;

    fn request(&mut self, word_count: u32) -> Result<RequestId, ExternalError>;

    /// Withdraw a request whose batch was abandoned and refund what it was charged.
    fn cancel(&mut self, id: RequestId) -> Result<(), ExternalError>;
}

/// The fungible consolation token.
pub trait ConsolationToken {
    fn balance_of(&self, account: &Address) -> u128;
    fn mint(&mut self, account: &Address, amount: u128) -> Result<(), ExternalError>;
    fn burn(&mut self, account: &Address, amount: u128) -> Result<(), ExternalError>;
    fn mint_referral(&mut self, referrer: &Address, amount: u128) -> Result<(), ExternalError>;
    fn mint_airdrop(&mut self, amount: u128) -> Result<(), ExternalError>;
}

/// Collectible receipts handed out for wins.
pub trait ReceiptLedger {
    fn mint(&mut self, account: &Address, id: ReceiptId, count: u32) -> Result<(), ExternalError>;
}

/// Push payments in the native asset.
pub trait NativeBank {
    fn transfer(&mut self, to: &Address, amount: u128) -> Result<(), ExternalError>;
}

/// Side-channel yield and gas rebates.
pub trait YieldSource {
    fn claimable_yield(&self) -> u128;
    fn claim_all_yield(&mut self, recipient: &Address) -> Result<u128, ExternalError>;
    fn max_claimable_gas(&self) -> u128;
    fn claim_max_gas(&mut self, recipient: &Address) -> Result<u128, ExternalError>;
}

/// Everything a [crate::Layer] may call out to.
pub trait Externals {
    type Gateway: RandomnessGateway;
    type Token: ConsolationToken;
    type Receipts: ReceiptLedger;
    type Bank: NativeBank;
    type Yield: YieldSource;

    fn gateway(&mut self) -> &mut Self::Gateway;
    fn token(&mut self) -> &mut Self::Token;
    fn receipts(&mut self) -> &mut Self::Receipts;
    fn bank(&mut self) -> &mut Self::Bank;

    /// `None` when the deployment has no side channel. Its presence enables the yield roll.
    fn yield_source(&mut self) -> Option<&mut Self::Yield>;
}
