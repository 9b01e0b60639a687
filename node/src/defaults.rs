//! Defaults for optional configuration fields.

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_MAILBOX_SIZE: usize = 1_024;
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 10_000;

pub const DEFAULT_MAX_WORDS_PER_REQUEST: u32 = 500;
pub const DEFAULT_FULFILLMENT_DELAY_MS: u64 = 2_000;
/// 1,000 native units.
pub const DEFAULT_SUBSCRIPTION_BALANCE: u128 = 1_000_000_000_000_000_000_000;
pub const DEFAULT_FEE_PER_WORD: u128 = 1_000_000_000;
