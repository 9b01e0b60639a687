use commonware_utils::{from_hex_formatted, hex};
use luckymint_types::mint::{
    check_bp, Address, CollectionConfig, GlobalLedger, MintError, MintTarget, TierKind, TierTable,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    net::SocketAddr,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};
use thiserror::Error;
use tracing::Level;

pub mod api;
pub mod books;
pub mod defaults;
pub mod engine;
pub mod gateway;
pub mod store;

#[derive(Clone, PartialEq, Eq)]
pub struct HexBytes(Vec<u8>);

impl AsRef<[u8]> for HexBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for HexBytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex(self.as_ref()))
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        let bytes = from_hex_formatted(&value)
            .ok_or_else(|| serde::de::Error::custom("expected a hex string"))?;
        Ok(Self(bytes))
    }
}

/// Simulated randomness gateway settings.
#[derive(Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default = "default_max_words_per_request")]
    pub max_words_per_request: u32,
    #[serde(default = "default_fulfillment_delay_ms")]
    pub fulfillment_delay_ms: u64,
    #[serde(default = "default_subscription_balance")]
    pub subscription_balance: u128,
    #[serde(default = "default_fee_per_word")]
    pub fee_per_word: u128,
    /// Hash-chain master secret. A random one is drawn when absent, which is only
    /// allowed without a snapshot.
    #[serde(default)]
    pub secret: Option<HexBytes>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_words_per_request: default_max_words_per_request(),
            fulfillment_delay_ms: default_fulfillment_delay_ms(),
            subscription_balance: default_subscription_balance(),
            fee_per_word: default_fee_per_word(),
            secret: None,
        }
    }
}

/// Side-channel yield. When enabled, every attempt carries a yield roll.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SideChannelConfig {
    pub enabled: bool,
    pub claimable_yield: u128,
    pub claimable_gas: u128,
}

/// A collection to configure at genesis. Omitted fields keep the unconfigured defaults.
#[derive(Debug, Deserialize, Serialize)]
pub struct CollectionSeed {
    pub target: MintTarget,
    #[serde(default)]
    pub mint_price: Option<u128>,
    #[serde(default)]
    pub risk: Option<u32>,
    #[serde(default)]
    pub mint_multiplier: Option<u64>,
    #[serde(default)]
    pub referral_fee_bp: Option<u32>,
    #[serde(default)]
    pub mint_fee_distribution_ratio_bp: Option<u32>,
}

/// State written when no snapshot exists.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GenesisConfig {
    pub ledger: GlobalLedger,
    pub collections: Vec<CollectionSeed>,
    pub consolation_tiers: TierTable,
    pub mint_token_tiers: TierTable,
}

/// Configuration for the node.
#[derive(Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
    #[serde(default = "default_mailbox_size")]
    pub mailbox_size: usize,
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,
    #[serde(default)]
    pub snapshot_path: Option<String>,

    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub side_channel: SideChannelConfig,
    #[serde(default)]
    pub genesis: GenesisConfig,
    /// Accounts whose native-asset transfers always fail.
    #[serde(default)]
    pub rejecting_recipients: Vec<Address>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("listen must be a socket address: {value}")]
    InvalidListen { value: String },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: usize },
    #[error("gateway.secret must be 32 bytes (got {len})")]
    InvalidSecretLength { len: usize },
    #[error("snapshot_path requires a fixed gateway.secret")]
    SnapshotWithoutSecret,
    #[error("genesis {field} is invalid: {source}")]
    InvalidGenesis {
        field: String,
        #[source]
        source: MintError,
    },
    #[error("genesis configures {target} more than once")]
    DuplicateCollection { target: MintTarget },
}

pub struct GatewaySettings {
    pub secret: [u8; 32],
    pub max_words: u32,
    pub fulfillment_delay: Duration,
    pub subscription_balance: u128,
    pub fee_per_word: u128,
}

/// Validated genesis state.
#[derive(Clone, Debug)]
pub struct Genesis {
    pub ledger: GlobalLedger,
    pub collections: Vec<CollectionConfig>,
    pub tiers: BTreeMap<TierKind, TierTable>,
}

pub struct ValidatedConfig {
    pub listen: SocketAddr,
    pub log_level: Level,
    pub json_logs: bool,
    pub mailbox_size: usize,
    pub event_log_capacity: usize,
    pub snapshot_path: Option<PathBuf>,
    pub gateway: GatewaySettings,
    pub side_channel: Option<SideChannelConfig>,
    pub genesis: Genesis,
    pub rejecting_recipients: HashSet<Address>,
}

struct RedactedConfig<'a>(&'a Config);

impl fmt::Debug for RedactedConfig<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cfg = self.0;
        f.debug_struct("Config")
            .field("listen", &cfg.listen)
            .field("log_level", &cfg.log_level)
            .field("json_logs", &cfg.json_logs)
            .field("mailbox_size", &cfg.mailbox_size)
            .field("event_log_capacity", &cfg.event_log_capacity)
            .field("snapshot_path", &cfg.snapshot_path)
            .field(
                "gateway.max_words_per_request",
                &cfg.gateway.max_words_per_request,
            )
            .field(
                "gateway.fulfillment_delay_ms",
                &cfg.gateway.fulfillment_delay_ms,
            )
            .field(
                "gateway.subscription_balance",
                &cfg.gateway.subscription_balance,
            )
            .field("gateway.fee_per_word", &cfg.gateway.fee_per_word)
            .field(
                "gateway.secret",
                &cfg.gateway.secret.as_ref().map(|_| "<redacted>"),
            )
            .field("side_channel", &cfg.side_channel)
            .field("genesis.ledger", &cfg.genesis.ledger)
            .field("genesis.collections", &cfg.genesis.collections.len())
            .field("rejecting_recipients", &cfg.rejecting_recipients)
            .finish()
    }
}

fn default_listen() -> String {
    defaults::DEFAULT_LISTEN.to_string()
}

fn default_log_level() -> String {
    defaults::DEFAULT_LOG_LEVEL.to_string()
}

fn default_mailbox_size() -> usize {
    defaults::DEFAULT_MAILBOX_SIZE
}

fn default_event_log_capacity() -> usize {
    defaults::DEFAULT_EVENT_LOG_CAPACITY
}

fn default_max_words_per_request() -> u32 {
    defaults::DEFAULT_MAX_WORDS_PER_REQUEST
}

fn default_fulfillment_delay_ms() -> u64 {
    defaults::DEFAULT_FULFILLMENT_DELAY_MS
}

fn default_subscription_balance() -> u128 {
    defaults::DEFAULT_SUBSCRIPTION_BALANCE
}

fn default_fee_per_word() -> u128 {
    defaults::DEFAULT_FEE_PER_WORD
}

fn ensure_nonzero(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidNonZero { field, value });
    }
    Ok(())
}

fn genesis_error(field: impl Into<String>) -> impl FnOnce(MintError) -> ConfigError {
    let field = field.into();
    move |source| ConfigError::InvalidGenesis { field, source }
}

impl GenesisConfig {
    fn validate(self) -> Result<Genesis, ConfigError> {
        let ledger = self.ledger;
        ledger.rates.validate().map_err(genesis_error("ledger.rates"))?;
        check_bp(ledger.yield_risk).map_err(genesis_error("ledger.yield_risk"))?;
        if ledger.eth_to_mint_ratio == 0 {
            return Err(genesis_error("ledger.eth_to_mint_ratio")(
                MintError::InvalidConversionRatio,
            ));
        }

        let mut seen = HashSet::new();
        let mut collections = Vec::with_capacity(self.collections.len());
        for seed in self.collections {
            let target = seed.target;
            if !target.is_valid() {
                return Err(genesis_error("collections")(MintError::InvalidTarget(target)));
            }
            if !seen.insert(target) {
                return Err(ConfigError::DuplicateCollection { target });
            }
            let field = format!("collections[{target}]");
            let mut config = CollectionConfig::unconfigured(
                target,
                ledger.rates.default_collection_referral_fee_bp,
            );
            if let Some(price) = seed.mint_price {
                config
                    .set_mint_price(price)
                    .map_err(genesis_error(field.clone()))?;
            }
            if let Some(risk) = seed.risk {
                config.set_risk(risk).map_err(genesis_error(field.clone()))?;
            }
            if let Some(multiplier) = seed.mint_multiplier {
                config
                    .set_mint_multiplier(multiplier)
                    .map_err(genesis_error(field.clone()))?;
            }
            if let Some(fee_bp) = seed.referral_fee_bp {
                config
                    .set_referral_fee_bp(fee_bp)
                    .map_err(genesis_error(field.clone()))?;
            }
            if let Some(ratio_bp) = seed.mint_fee_distribution_ratio_bp {
                config
                    .set_mint_fee_distribution_ratio_bp(ratio_bp)
                    .map_err(genesis_error(field))?;
            }
            collections.push(config);
        }

        let tiers = BTreeMap::from([
            (TierKind::Consolation, self.consolation_tiers),
            (TierKind::MintToken, self.mint_token_tiers),
        ]);
        Ok(Genesis {
            ledger,
            collections,
            tiers,
        })
    }
}

impl Config {
    pub fn redacted_debug(&self) -> impl fmt::Debug + '_ {
        RedactedConfig(self)
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;
        let listen = SocketAddr::from_str(&self.listen).map_err(|_| {
            ConfigError::InvalidListen {
                value: self.listen.clone(),
            }
        })?;
        ensure_nonzero("mailbox_size", self.mailbox_size)?;
        ensure_nonzero("event_log_capacity", self.event_log_capacity)?;
        ensure_nonzero(
            "gateway.max_words_per_request",
            self.gateway.max_words_per_request as usize,
        )?;

        let secret = match &self.gateway.secret {
            Some(bytes) => <[u8; 32]>::try_from(bytes.as_ref()).map_err(|_| {
                ConfigError::InvalidSecretLength {
                    len: bytes.as_ref().len(),
                }
            })?,
            // Resumed requests are re-derived from the secret, so it must outlive the process.
            None if self.snapshot_path.is_some() => {
                return Err(ConfigError::SnapshotWithoutSecret);
            }
            None => {
                let mut secret = [0u8; 32];
                OsRng.fill_bytes(&mut secret);
                secret
            }
        };

        let genesis = self.genesis.validate()?;
        Ok(ValidatedConfig {
            listen,
            log_level,
            json_logs: self.json_logs,
            mailbox_size: self.mailbox_size,
            event_log_capacity: self.event_log_capacity,
            snapshot_path: self.snapshot_path.map(PathBuf::from),
            gateway: GatewaySettings {
                secret,
                max_words: self.gateway.max_words_per_request,
                fulfillment_delay: Duration::from_millis(self.gateway.fulfillment_delay_ms),
                subscription_balance: self.gateway.subscription_balance,
                fee_per_word: self.gateway.fee_per_word,
            },
            side_channel: self.side_channel.enabled.then_some(self.side_channel),
            genesis,
            rejecting_recipients: self.rejecting_recipients.into_iter().collect(),
        })
    }
}
