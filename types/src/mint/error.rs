use thiserror::Error as ThisError;

use super::{MintTarget, RequestId};

/// Failures raised by the minting protocol.
///
/// Every variant is raised before the failing operation mutates durable state.
#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum MintError {
    // Input validation
    #[error("number of mints must be greater than zero")]
    InvalidNumberOfMints,
    #[error("batch of {attempts} attempts exceeds the gateway ceiling of {max}")]
    BatchTooLarge { attempts: u32, max: u32 },
    #[error("price per attempt {price} is below the minimum {minimum}")]
    PricePerAttemptTooLow { price: u128, minimum: u128 },
    #[error("payment {paid} is not a multiple of the price per attempt {price}")]
    IncorrectPaymentAmount { paid: u128, price: u128 },
    #[error("token price per attempt {price} is not a multiple of the conversion ratio {ratio}")]
    InvalidTokenPrice { price: u128, ratio: u64 },
    #[error("invalid mint target {0}")]
    InvalidTarget(MintTarget),
    #[error("prize value must be provided for native-asset prize batches and only for them")]
    InvalidPrizeValue,
    #[error("value {value} exceeds basis {basis}")]
    BasisExceeded { value: u64, basis: u32 },
    #[error("mint price must be greater than zero")]
    InvalidMintPrice,
    #[error("conversion ratio must be greater than zero")]
    InvalidConversionRatio,
    #[error("fee rates sum past the gross payment")]
    InvalidFeeConfiguration,
    #[error("tier table has too many tiers")]
    InvalidTierTable,
    #[error("amount must be greater than zero")]
    ZeroAmount,

    // Solvency
    #[error("insufficient consolation fees (required={required}, available={available})")]
    InsufficientConsolationFees { required: u128, available: u128 },
    #[error("insufficient mint earnings (required={required}, available={available})")]
    InsufficientMintEarnings { required: u128, available: u128 },
    #[error("insufficient protocol fees (required={required}, available={available})")]
    InsufficientProtocolFees { required: u128, available: u128 },
    #[error("insufficient token balance (required={required}, available={available})")]
    InsufficientTokenBalance { required: u128, available: u128 },
    #[error("maximum payout {payout} exceeds buffered mint earnings {available}")]
    PrizeExceedsEarningsBuffer { payout: u128, available: u128 },
    #[error("arithmetic overflow")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,

    // Protocol / state
    #[error("unknown request {0}")]
    UnknownRequest(RequestId),
    #[error("request {0} is already pending")]
    DuplicateRequest(RequestId),
    #[error("unmatched random words (expected={expected}, got={got})")]
    UnmatchedRandomWords { expected: usize, got: usize },
    #[error("{0} has pending requests")]
    PendingRequests(MintTarget),

    // External dependencies
    #[error("randomness gateway rejected the request: {0}")]
    GatewayRejected(String),
    #[error("native-asset transfer of {amount} failed")]
    TransferFailed { amount: u128 },
}
