use super::super::*;
use luckymint_types::{
    mint::{check_bp, MintError},
    Setting,
};
use tracing::info;

impl<'a, S: State, X: Externals> Layer<'a, S, X> {
    pub(in crate::layer) async fn handle_configure(
        &mut self,
        setting: &Setting,
    ) -> Result<Vec<Event>> {
        match setting {
            Setting::CollectionMintPrice { target, price } => {
                self.update_collection(*target, |config| config.set_mint_price(*price))
                    .await?
            }
            Setting::CollectionRisk { target, risk } => {
                self.update_collection(*target, |config| config.set_risk(*risk))
                    .await?
            }
            Setting::CollectionMintMultiplier { target, multiplier } => {
                self.update_collection(*target, |config| {
                    config.set_mint_multiplier(*multiplier)
                })
                .await?
            }
            Setting::CollectionReferralFee { target, fee_bp } => {
                self.update_collection(*target, |config| config.set_referral_fee_bp(*fee_bp))
                    .await?
            }
            Setting::CollectionMintFeeDistributionRatio { target, ratio_bp } => {
                self.update_collection(*target, |config| {
                    config.set_mint_fee_distribution_ratio_bp(*ratio_bp)
                })
                .await?
            }
            Setting::Tiers { kind, tiers } => {
                self.stage(Key::Tiers(*kind), Value::Tiers(tiers.clone()));
            }
            _ => {
                let mut ledger = self.get_or_init_ledger().await?;
                apply_ledger_setting(&mut ledger, setting)?;
                self.put_ledger(ledger);
            }
        }

        info!(?setting, "configuration updated");
        Ok(vec![Event::ConfigUpdated {
            setting: setting.clone(),
        }])
    }

    async fn update_collection(
        &mut self,
        target: MintTarget,
        update: impl FnOnce(&mut CollectionConfig) -> Result<(), MintError>,
    ) -> Result<()> {
        if !target.is_valid() {
            return Err(MintError::InvalidTarget(target).into());
        }
        let mut config = self.get_or_init_collection(target).await?;
        update(&mut config)?;
        self.put_collection(config);
        Ok(())
    }
}

/// Apply a global setting to `ledger`, rejecting it if the resulting rates are inconsistent.
fn apply_ledger_setting(ledger: &mut GlobalLedger, setting: &Setting) -> Result<(), MintError> {
    let mut rates = ledger.rates;
    let (slot, value) = match *setting {
        Setting::EthToMintRatio(ratio) => {
            if ratio == 0 {
                return Err(MintError::InvalidConversionRatio);
            }
            ledger.eth_to_mint_ratio = ratio;
            return Ok(());
        }
        Setting::YieldRisk(risk) => {
            check_bp(risk)?;
            ledger.yield_risk = risk;
            return Ok(());
        }
        Setting::MintFee(bp) => (&mut rates.mint_fee_bp, bp),
        Setting::MintForEthConsolationFee(bp) => (&mut rates.mint_for_eth_consolation_fee_bp, bp),
        Setting::MintTokenConsolationFee(bp) => (&mut rates.mint_token_consolation_fee_bp, bp),
        Setting::CollectionConsolationFee(bp) => (&mut rates.collection_consolation_fee_bp, bp),
        Setting::MintEarningsBuffer(bp) => (&mut rates.mint_earnings_buffer_bp, bp),
        Setting::RedemptionFee(bp) => (&mut rates.redemption_fee_bp, bp),
        Setting::DefaultCollectionReferralFee(bp) => {
            (&mut rates.default_collection_referral_fee_bp, bp)
        }
        _ => return Ok(()),
    };

    check_bp(value)?;
    *slot = value;
    rates.validate()?;
    ledger.rates = rates;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use luckymint_types::mint::{FeeRates, BASIS};

    #[test]
    fn rate_updates_are_checked_against_the_whole_table() {
        let mut ledger = GlobalLedger::default();
        apply_ledger_setting(&mut ledger, &Setting::RedemptionFee(1)).unwrap();
        assert_eq!(ledger.rates.redemption_fee_bp, 1);

        assert!(matches!(
            apply_ledger_setting(&mut ledger, &Setting::MintFee(BASIS + 1)),
            Err(MintError::BasisExceeded { .. })
        ));
        assert_eq!(
            apply_ledger_setting(&mut ledger, &Setting::MintFee(BASIS)),
            Err(MintError::InvalidFeeConfiguration)
        );
        assert_eq!(ledger.rates.mint_fee_bp, FeeRates::default().mint_fee_bp);
    }

    #[test]
    fn zero_ratio_is_rejected() {
        let mut ledger = GlobalLedger::default();
        assert_eq!(
            apply_ledger_setting(&mut ledger, &Setting::EthToMintRatio(0)),
            Err(MintError::InvalidConversionRatio)
        );
        apply_ledger_setting(&mut ledger, &Setting::EthToMintRatio(7)).unwrap();
        assert_eq!(ledger.eth_to_mint_ratio, 7);
    }
}
