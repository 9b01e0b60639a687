use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use serde::{Deserialize, Serialize};

use super::{MintError, BASIS, DEFAULT_ETH_TO_MINT_RATIO};

/// Global fee parameters, all in parts of [BASIS].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeRates {
    pub mint_fee_bp: u32,
    pub mint_for_eth_consolation_fee_bp: u32,
    pub mint_token_consolation_fee_bp: u32,
    pub collection_consolation_fee_bp: u32,
    pub mint_earnings_buffer_bp: u32,
    pub redemption_fee_bp: u32,
    pub default_collection_referral_fee_bp: u32,
}

impl Default for FeeRates {
    fn default() -> Self {
        Self {
            mint_fee_bp: 50_000_000,
            mint_for_eth_consolation_fee_bp: 100_000_000,
            mint_token_consolation_fee_bp: 900_000_000,
            collection_consolation_fee_bp: 100_000_000,
            mint_earnings_buffer_bp: 100_000_000,
            redemption_fee_bp: 20_000_000,
            default_collection_referral_fee_bp: 100_000_000,
        }
    }
}

impl FeeRates {
    /// Every rate must be a valid fraction of [BASIS], and the protocol fee plus
    /// either consolation fee must not claim more than the whole payment.
    pub fn validate(&self) -> Result<(), MintError> {
        for rate in [
            self.mint_fee_bp,
            self.mint_for_eth_consolation_fee_bp,
            self.mint_token_consolation_fee_bp,
            self.collection_consolation_fee_bp,
            self.mint_earnings_buffer_bp,
            self.redemption_fee_bp,
            self.default_collection_referral_fee_bp,
        ] {
            check_bp(rate)?;
        }
        for consolation in [
            self.mint_for_eth_consolation_fee_bp,
            self.collection_consolation_fee_bp,
        ] {
            if self.mint_fee_bp as u64 + consolation as u64 > BASIS as u64 {
                return Err(MintError::InvalidFeeConfiguration);
            }
        }
        Ok(())
    }
}

pub fn check_bp(value: u32) -> Result<(), MintError> {
    if value > BASIS {
        return Err(MintError::BasisExceeded {
            value: value as u64,
            basis: BASIS,
        });
    }
    Ok(())
}

impl Write for FeeRates {
    fn write(&self, writer: &mut impl BufMut) {
        self.mint_fee_bp.write(writer);
        self.mint_for_eth_consolation_fee_bp.write(writer);
        self.mint_token_consolation_fee_bp.write(writer);
        self.collection_consolation_fee_bp.write(writer);
        self.mint_earnings_buffer_bp.write(writer);
        self.redemption_fee_bp.write(writer);
        self.default_collection_referral_fee_bp.write(writer);
    }
}

impl Read for FeeRates {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            mint_fee_bp: u32::read(reader)?,
            mint_for_eth_consolation_fee_bp: u32::read(reader)?,
            mint_token_consolation_fee_bp: u32::read(reader)?,
            collection_consolation_fee_bp: u32::read(reader)?,
            mint_earnings_buffer_bp: u32::read(reader)?,
            redemption_fee_bp: u32::read(reader)?,
            default_collection_referral_fee_bp: u32::read(reader)?,
        })
    }
}

impl FixedSize for FeeRates {
    const SIZE: usize = 7 * u32::SIZE;
}

/// The three accumulators the ledger maintains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pool {
    Consolation,
    Earnings,
    Protocol,
}

/// Process-wide accounting context.
///
/// Pools are unsigned and every debit is checked before it lands, so a pool can
/// never go negative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalLedger {
    pub consolation_fees: u128,
    pub mint_earnings: u128,
    pub protocol_fees: u128,
    pub eth_to_mint_ratio: u64,
    pub rates: FeeRates,
    pub yield_risk: u32,
}

impl Default for GlobalLedger {
    fn default() -> Self {
        Self {
            consolation_fees: 0,
            mint_earnings: 0,
            protocol_fees: 0,
            eth_to_mint_ratio: DEFAULT_ETH_TO_MINT_RATIO,
            rates: FeeRates::default(),
            yield_risk: 0,
        }
    }
}

impl GlobalLedger {
    pub fn balance(&self, pool: Pool) -> u128 {
        match pool {
            Pool::Consolation => self.consolation_fees,
            Pool::Earnings => self.mint_earnings,
            Pool::Protocol => self.protocol_fees,
        }
    }

    fn slot(&mut self, pool: Pool) -> &mut u128 {
        match pool {
            Pool::Consolation => &mut self.consolation_fees,
            Pool::Earnings => &mut self.mint_earnings,
            Pool::Protocol => &mut self.protocol_fees,
        }
    }

    pub fn credit(&mut self, pool: Pool, amount: u128) -> Result<(), MintError> {
        let slot = self.slot(pool);
        *slot = slot.checked_add(amount).ok_or(MintError::Overflow)?;
        Ok(())
    }

    pub fn debit(&mut self, pool: Pool, amount: u128) -> Result<(), MintError> {
        let slot = self.slot(pool);
        let available = *slot;
        *slot = available
            .checked_sub(amount)
            .ok_or_else(|| insufficient(pool, amount, available))?;
        Ok(())
    }

    /// Native-asset value backing `tokens` consolation tokens.
    pub fn tokens_to_native(&self, tokens: u128) -> Result<u128, MintError> {
        if self.eth_to_mint_ratio == 0 {
            return Err(MintError::InvalidConversionRatio);
        }
        Ok(tokens / self.eth_to_mint_ratio as u128)
    }

    /// Consolation tokens worth `native` units of the native asset.
    pub fn native_to_tokens(&self, native: u128) -> Result<u128, MintError> {
        native
            .checked_mul(self.eth_to_mint_ratio as u128)
            .ok_or(MintError::Overflow)
    }
}

fn insufficient(pool: Pool, required: u128, available: u128) -> MintError {
    match pool {
        Pool::Consolation => MintError::InsufficientConsolationFees {
            required,
            available,
        },
        Pool::Earnings => MintError::InsufficientMintEarnings {
            required,
            available,
        },
        Pool::Protocol => MintError::InsufficientProtocolFees {
            required,
            available,
        },
    }
}

impl Write for GlobalLedger {
    fn write(&self, writer: &mut impl BufMut) {
        self.consolation_fees.write(writer);
        self.mint_earnings.write(writer);
        self.protocol_fees.write(writer);
        self.eth_to_mint_ratio.write(writer);
        self.rates.write(writer);
        self.yield_risk.write(writer);
    }
}

impl Read for GlobalLedger {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            consolation_fees: u128::read(reader)?,
            mint_earnings: u128::read(reader)?,
            protocol_fees: u128::read(reader)?,
            eth_to_mint_ratio: u64::read(reader)?,
            rates: FeeRates::read(reader)?,
            yield_risk: u32::read(reader)?,
        })
    }
}

impl EncodeSize for GlobalLedger {
    fn encode_size(&self) -> usize {
        3 * u128::SIZE + u64::SIZE + FeeRates::SIZE + u32::SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt, Encode};

    #[test]
    fn debit_past_zero_is_rejected_without_mutation() {
        let mut ledger = GlobalLedger {
            consolation_fees: 10,
            ..Default::default()
        };
        let err = ledger.debit(Pool::Consolation, 11).unwrap_err();
        assert_eq!(
            err,
            MintError::InsufficientConsolationFees {
                required: 11,
                available: 10
            }
        );
        assert_eq!(ledger.consolation_fees, 10);

        ledger.debit(Pool::Consolation, 10).unwrap();
        assert_eq!(ledger.consolation_fees, 0);
    }

    #[test]
    fn each_pool_reports_its_own_shortfall() {
        let mut ledger = GlobalLedger::default();
        assert!(matches!(
            ledger.debit(Pool::Earnings, 1),
            Err(MintError::InsufficientMintEarnings { .. })
        ));
        assert!(matches!(
            ledger.debit(Pool::Protocol, 1),
            Err(MintError::InsufficientProtocolFees { .. })
        ));
    }

    #[test]
    fn credit_overflow_is_rejected() {
        let mut ledger = GlobalLedger {
            mint_earnings: u128::MAX,
            ..Default::default()
        };
        assert_eq!(ledger.credit(Pool::Earnings, 1), Err(MintError::Overflow));
        assert_eq!(ledger.mint_earnings, u128::MAX);
    }

    #[test]
    fn conversion_uses_ratio() {
        let ledger = GlobalLedger::default();
        assert_eq!(ledger.native_to_tokens(3).unwrap(), 3 * DEFAULT_ETH_TO_MINT_RATIO as u128);
        assert_eq!(ledger.tokens_to_native(2_999_999).unwrap(), 2);
    }

    #[test]
    fn rates_above_basis_fail_validation() {
        let rates = FeeRates {
            redemption_fee_bp: BASIS + 1,
            ..Default::default()
        };
        assert!(rates.validate().is_err());
        assert!(FeeRates::default().validate().is_ok());

        let overcommitted = FeeRates {
            mint_fee_bp: BASIS / 2,
            collection_consolation_fee_bp: BASIS / 2 + 1,
            ..Default::default()
        };
        assert_eq!(
            overcommitted.validate(),
            Err(MintError::InvalidFeeConfiguration)
        );
    }

    #[test]
    fn codec_roundtrip() {
        let ledger = GlobalLedger {
            consolation_fees: 1,
            mint_earnings: 2,
            protocol_fees: 3,
            yield_risk: 4,
            ..Default::default()
        };
        let encoded = ledger.encode();
        assert_eq!(encoded.len(), ledger.encode_size());
        assert_eq!(GlobalLedger::decode(encoded).unwrap(), ledger);
    }
}
