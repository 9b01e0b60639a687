/// Denominator for every rate in the protocol (parts-per-billion).
pub const BASIS: u32 = 1_000_000_000;

/// Scale used when computing ratios that must keep precision before a final division.
pub const SCALE: u128 = 1_000_000_000_000_000_000_000_000_000_000_000_000;

/// One native-asset unit expressed in its smallest denomination (wei).
pub const NATIVE_UNIT: u128 = 1_000_000_000_000_000_000;

/// Smallest price a single attempt may be charged (1000 gwei).
pub const MINIMUM_PRICE_PER_ATTEMPT: u128 = 1_000_000_000_000;

/// Mint price assumed for a collection that was never explicitly priced (0.01 native units).
pub const DEFAULT_COLLECTION_MINT_PRICE: u128 = 10_000_000_000_000_000;

/// Risk assumed for a collection that was never explicitly configured (0.1%).
pub const DEFAULT_COLLECTION_RISK: u32 = 1_000_000;

/// Unity multiplier.
pub const DEFAULT_COLLECTION_MINT_MULTIPLIER: u64 = BASIS as u64;

/// Consolation tokens minted per native-asset unit.
pub const DEFAULT_ETH_TO_MINT_RATIO: u64 = 1_000_000;

/// Random words consumed by a two-stage attempt (win roll + tier roll).
pub const TWO_STAGE_WORDS_PER_ATTEMPT: u32 = 2;

/// Random words consumed by a single-stage attempt (tier roll only).
pub const SINGLE_STAGE_WORDS_PER_ATTEMPT: u32 = 1;

/// Extra word per attempt when the side-channel yield roll is enabled.
pub const YIELD_ROLL_WORDS_PER_ATTEMPT: u32 = 1;

/// Sentinel address standing in for the native asset as a mint target.
pub const NATIVE_ASSET_ADDRESS: [u8; 20] = [0xff; 20];

/// Sentinel address standing in for the consolation token as a mint target.
pub const CONSOLATION_TOKEN_ADDRESS: [u8; 20] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xfe,
];

/// Upper bound on tiers in a single table.
pub const MAX_TIERS: usize = 64;

/// Upper bound on pending requests decoded for a single collection.
pub const MAX_PENDING_REQUESTS: usize = 1 << 20;
