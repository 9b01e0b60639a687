use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use serde::{Deserialize, Serialize};

use crate::mint::{
    Address, CollectionConfig, Currency, FeeSplit, GlobalLedger, MintTarget, PendingRequest,
    RequestId, TierKind, TierTable,
};

/// How a batch is paid for.
///
/// Client-facing enums are externally tagged so 128-bit amounts decode without
/// being buffered through a lossy intermediate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payment {
    /// Native asset attached to the call. Price per attempt is `value / attempts`.
    Native { value: u128 },
    /// Consolation tokens burned from the minter at an explicit per-attempt price.
    Token { price_per_attempt: u128 },
}

impl Payment {
    pub fn currency(&self) -> Currency {
        match self {
            Self::Native { .. } => Currency::Native,
            Self::Token { .. } => Currency::Token,
        }
    }
}

/// A governance change. Each one is echoed back in [Event::ConfigUpdated].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Setting {
    CollectionMintPrice { target: MintTarget, price: u128 },
    CollectionRisk { target: MintTarget, risk: u32 },
    CollectionMintMultiplier { target: MintTarget, multiplier: u64 },
    CollectionReferralFee { target: MintTarget, fee_bp: u32 },
    CollectionMintFeeDistributionRatio { target: MintTarget, ratio_bp: u32 },
    EthToMintRatio(u64),
    MintFee(u32),
    MintForEthConsolationFee(u32),
    MintTokenConsolationFee(u32),
    CollectionConsolationFee(u32),
    MintEarningsBuffer(u32),
    RedemptionFee(u32),
    DefaultCollectionReferralFee(u32),
    YieldRisk(u32),
    Tiers { kind: TierKind, tiers: TierTable },
}

/// A paid batch of mint attempts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSubmission {
    pub minter: Address,
    #[serde(default)]
    pub referrer: Option<Address>,
    pub target: MintTarget,
    pub attempts: u32,
    pub payment: Payment,
    /// Required for native-asset prize batches, rejected otherwise.
    #[serde(default)]
    pub prize_value: Option<u128>,
}

/// Operations accepted from clients.
///
/// Randomness fulfilments are not instructions: they arrive only from the gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instruction {
    SubmitBatch(BatchSubmission),
    Configure(Setting),
    FundConsolationFees {
        amount: u128,
    },
    MintAirdrop {
        value: u128,
    },
    Redeem {
        account: Address,
        token_amount: u128,
    },
    ClaimMintEarnings {
        recipient: Address,
        amount: u128,
    },
    ClaimProtocolFees {
        recipient: Address,
    },
}

#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Debug)]
pub enum Key {
    Ledger,
    Collection(MintTarget),
    PendingRequest(RequestId),
    Tiers(TierKind),
}

impl Write for Key {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Ledger => 0u8.write(writer),
            Self::Collection(target) => {
                1u8.write(writer);
                target.write(writer);
            }
            Self::PendingRequest(id) => {
                2u8.write(writer);
                id.write(writer);
            }
            Self::Tiers(kind) => {
                3u8.write(writer);
                kind.write(writer);
            }
        }
    }
}

impl Read for Key {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let key = match u8::read(reader)? {
            0 => Self::Ledger,
            1 => Self::Collection(MintTarget::read(reader)?),
            2 => Self::PendingRequest(RequestId::read(reader)?),
            3 => Self::Tiers(TierKind::read(reader)?),
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(key)
    }
}

impl EncodeSize for Key {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Ledger => 0,
                Self::Collection(target) => target.encode_size(),
                Self::PendingRequest(_) => RequestId::SIZE,
                Self::Tiers(_) => TierKind::SIZE,
            }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Value {
    Ledger(GlobalLedger),
    Collection(CollectionConfig),
    PendingRequest(PendingRequest),
    Tiers(TierTable),
}

impl Write for Value {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Ledger(ledger) => {
                0u8.write(writer);
                ledger.write(writer);
            }
            Self::Collection(config) => {
                1u8.write(writer);
                config.write(writer);
            }
            Self::PendingRequest(request) => {
                2u8.write(writer);
                request.write(writer);
            }
            Self::Tiers(tiers) => {
                3u8.write(writer);
                tiers.write(writer);
            }
        }
    }
}

impl Read for Value {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = match u8::read(reader)? {
            0 => Self::Ledger(GlobalLedger::read(reader)?),
            1 => Self::Collection(CollectionConfig::read(reader)?),
            2 => Self::PendingRequest(PendingRequest::read(reader)?),
            3 => Self::Tiers(TierTable::read(reader)?),
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(value)
    }
}

impl EncodeSize for Value {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Ledger(ledger) => ledger.encode_size(),
                Self::Collection(config) => config.encode_size(),
                Self::PendingRequest(request) => request.encode_size(),
                Self::Tiers(tiers) => tiers.encode_size(),
            }
    }
}

/// Why a native-asset prize was escrowed as receipts instead of paid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    InsufficientEarnings,
    TransferRejected,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    MintRequested {
        request_id: RequestId,
        minter: Address,
        target: MintTarget,
        attempts: u32,
        word_count: u32,
        currency: Currency,
        fees: FeeSplit,
    },
    ReferralPaid {
        request_id: RequestId,
        referrer: Address,
        amount: u128,
        currency: Currency,
    },
    MintResult {
        request_id: RequestId,
        minter: Address,
        target: MintTarget,
        attempts: u32,
        total_mint_amount: u128,
        total_wins: u32,
        total_prize_value: u128,
        #[serde(skip_serializing_if = "Option::is_none")]
        total_side_channel_amount: Option<u128>,
    },
    PrizeEscrowed {
        request_id: RequestId,
        minter: Address,
        amount: u128,
        receipts: u32,
        reason: FallbackReason,
    },
    ConfigUpdated {
        setting: Setting,
    },
    ConsolationFeesFunded {
        amount: u128,
        consolation_fees: u128,
    },
    AirdropMinted {
        value: u128,
        tokens: u128,
    },
    Redeemed {
        account: Address,
        token_amount: u128,
        payout: u128,
    },
    MintEarningsClaimed {
        recipient: Address,
        amount: u128,
    },
    ProtocolFeesClaimed {
        recipient: Address,
        amount: u128,
    },
}
