use serde::{Deserialize, Serialize};
use std::fmt;

use super::{apply_bp, CollectionConfig, FeeRates, MintError, MintTarget};

/// Currency a batch is paid in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    Native,
    Token,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Token => write!(f, "token"),
        }
    }
}

/// How a gross payment (in native-asset units) divides between the pools.
///
/// `consolation_credit + protocol_credit + earnings_credit + referral_fee == gross`
/// holds exactly for every target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FeeSplit {
    pub gross: u128,
    pub consolation_fee: u128,
    /// Carve-out from the consolation fee handed back to mint earnings.
    pub depositor_fee: u128,
    pub protocol_fee: u128,
    pub referral_fee: u128,

    pub consolation_credit: u128,
    pub protocol_credit: u128,
    pub earnings_credit: u128,
}

impl FeeSplit {
    pub fn compute(
        gross: u128,
        target: &MintTarget,
        rates: &FeeRates,
        collection: &CollectionConfig,
        referred: bool,
    ) -> Result<Self, MintError> {
        let referral_rate = if collection.referral_fee_bp != 0 {
            collection.referral_fee_bp
        } else {
            rates.default_collection_referral_fee_bp
        };

        let (consolation_fee, depositor_fee, protocol_fee) = match target {
            MintTarget::ConsolationToken => {
                // No earnings leg: whatever consolation does not keep is protocol revenue.
                let consolation_fee = apply_bp(gross, rates.mint_token_consolation_fee_bp)?;
                let protocol_fee = gross
                    .checked_sub(consolation_fee)
                    .ok_or(MintError::InvalidFeeConfiguration)?;
                (consolation_fee, 0, protocol_fee)
            }
            MintTarget::NativeAsset | MintTarget::Collection(_) => {
                let rate = match target {
                    MintTarget::NativeAsset => rates.mint_for_eth_consolation_fee_bp,
                    _ => rates.collection_consolation_fee_bp,
                };
                let consolation_fee = apply_bp(gross, rate)?;
                let depositor_fee =
                    apply_bp(consolation_fee, collection.mint_fee_distribution_ratio_bp)?;
                let protocol_fee = apply_bp(gross, rates.mint_fee_bp)?;
                (consolation_fee, depositor_fee, protocol_fee)
            }
        };

        let referral_fee = if referred {
            apply_bp(protocol_fee, referral_rate)?
        } else {
            0
        };

        let earnings_credit = match target {
            MintTarget::ConsolationToken => 0,
            _ => gross
                .checked_sub(consolation_fee)
                .and_then(|rest| rest.checked_sub(protocol_fee))
                .and_then(|rest| rest.checked_add(depositor_fee))
                .ok_or(MintError::InvalidFeeConfiguration)?,
        };

        Ok(Self {
            gross,
            consolation_fee,
            depositor_fee,
            protocol_fee,
            referral_fee,
            consolation_credit: consolation_fee
                .checked_sub(depositor_fee)
                .ok_or(MintError::InvalidFeeConfiguration)?,
            protocol_credit: protocol_fee
                .checked_sub(referral_fee)
                .ok_or(MintError::InvalidFeeConfiguration)?,
            earnings_credit,
        })
    }

    /// Sum of every credited amount.
    pub fn total(&self) -> Option<u128> {
        self.consolation_credit
            .checked_add(self.protocol_credit)?
            .checked_add(self.earnings_credit)?
            .checked_add(self.referral_fee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mint::{Address, BASIS};
    use proptest::prelude::*;

    fn config(target: MintTarget, ratio: u32, referral: u32) -> CollectionConfig {
        let mut config = CollectionConfig::unconfigured(target, referral);
        config.set_mint_fee_distribution_ratio_bp(ratio).unwrap();
        config
    }

    #[test]
    fn collection_split_matches_formula() {
        let rates = FeeRates {
            mint_fee_bp: 50_000_000,
            collection_consolation_fee_bp: 100_000_000,
            ..Default::default()
        };
        let target = MintTarget::Collection(Address::from_low_u64(1));
        let collection = config(target, 500_000_000, 200_000_000);

        let split = FeeSplit::compute(1_000_000, &target, &rates, &collection, true).unwrap();
        assert_eq!(split.consolation_fee, 100_000);
        assert_eq!(split.depositor_fee, 50_000);
        assert_eq!(split.protocol_fee, 50_000);
        assert_eq!(split.referral_fee, 10_000);
        assert_eq!(split.consolation_credit, 50_000);
        assert_eq!(split.protocol_credit, 40_000);
        assert_eq!(split.earnings_credit, 900_000);
        assert_eq!(split.total(), Some(1_000_000));
    }

    #[test]
    fn token_target_has_no_earnings_leg() {
        let rates = FeeRates {
            mint_token_consolation_fee_bp: 900_000_000,
            ..Default::default()
        };
        let target = MintTarget::ConsolationToken;
        let collection = config(target, BASIS, 0);

        let split = FeeSplit::compute(1_000, &target, &rates, &collection, false).unwrap();
        assert_eq!(split.earnings_credit, 0);
        assert_eq!(split.depositor_fee, 0);
        assert_eq!(split.consolation_credit, 900);
        assert_eq!(split.protocol_credit, 100);
    }

    #[test]
    fn referral_falls_back_to_default_rate() {
        let rates = FeeRates {
            mint_fee_bp: 100_000_000,
            default_collection_referral_fee_bp: 500_000_000,
            ..Default::default()
        };
        let target = MintTarget::NativeAsset;
        let collection = config(target, 0, 0);

        let split = FeeSplit::compute(1_000, &target, &rates, &collection, true).unwrap();
        assert_eq!(split.protocol_fee, 100);
        assert_eq!(split.referral_fee, 50);
    }

    #[test]
    fn overcommitted_rates_are_rejected() {
        let rates = FeeRates {
            mint_fee_bp: 600_000_000,
            mint_for_eth_consolation_fee_bp: 600_000_000,
            ..Default::default()
        };
        let target = MintTarget::NativeAsset;
        let collection = config(target, 0, 0);
        assert_eq!(
            FeeSplit::compute(1_000, &target, &rates, &collection, false),
            Err(MintError::InvalidFeeConfiguration)
        );
    }

    fn arb_target() -> impl Strategy<Value = MintTarget> {
        prop_oneof![
            Just(MintTarget::NativeAsset),
            Just(MintTarget::ConsolationToken),
            (1u64..u64::MAX).prop_map(|n| MintTarget::Collection(Address::from_low_u64(n))),
        ]
    }

    proptest! {
        /// Credits always reconstruct the gross payment exactly.
        #[test]
        fn prop_split_conserves_gross(
            gross in 0u128..(1u128 << 100),
            target in arb_target(),
            consolation_bp in 0u32..=BASIS / 2,
            mint_fee_bp in 0u32..=BASIS / 2,
            ratio_bp in 0u32..=BASIS,
            referral_bp in 0u32..=BASIS,
            referred in any::<bool>(),
        ) {
            let rates = FeeRates {
                mint_fee_bp,
                mint_for_eth_consolation_fee_bp: consolation_bp,
                mint_token_consolation_fee_bp: consolation_bp,
                collection_consolation_fee_bp: consolation_bp,
                default_collection_referral_fee_bp: referral_bp,
                ..Default::default()
            };
            let collection = config(target, ratio_bp, referral_bp);
            let split = FeeSplit::compute(gross, &target, &rates, &collection, referred).unwrap();

            prop_assert_eq!(split.total(), Some(gross));
            prop_assert!(split.referral_fee <= split.protocol_fee);
            prop_assert!(split.depositor_fee <= split.consolation_fee);
            if !referred {
                prop_assert_eq!(split.referral_fee, 0);
            }
        }
    }
}
