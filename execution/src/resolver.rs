//! Outcome resolution.
//!
//! [resolve] is a pure function of a pending request, the configuration it resolves
//! against, and the delivered random words. It never touches state.

use luckymint_types::mint::{
    normalize, Fixed, MintError, MintTarget, PendingRequest, ResolutionMode, TierTable, BASIS,
};
use primitive_types::U256;

/// Configuration read at resolution time.
#[derive(Clone, Copy, Debug)]
pub struct ResolutionContext<'a> {
    pub risk: u32,
    pub mint_price: u128,
    pub mint_multiplier: u64,
    pub eth_to_mint_ratio: u64,
    pub yield_risk: u32,
    pub tiers: &'a TierTable,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Consolation tokens owed to the minter.
    pub total_mint_amount: u128,
    /// Sum of selected tier multipliers across consolation rolls.
    pub cumulative_tier_multiplier: u128,
    /// Winning attempts (receipts for collections, prizes for the native asset).
    pub total_wins: u32,
    /// Native-asset prize owed, `total_wins * prize_value` for prize batches.
    pub total_prize_value: u128,
    /// Attempts whose side-channel yield roll succeeded.
    pub yield_wins: u32,
}

/// Win threshold for a two-stage attempt against `request.target`.
fn win_risk(ctx: &ResolutionContext<'_>, request: &PendingRequest) -> Result<U256, MintError> {
    match request.target {
        MintTarget::NativeAsset => Ok(Fixed::new(request.mint_earnings_fee_per_attempt)
            .mul(BASIS)?
            .div(request.prize_value)?
            .raw()),
        _ => Ok(Fixed::new(ctx.risk)
            .mul(request.price_adjustment_factor)?
            .div(BASIS)?
            .raw()),
    }
}

pub fn resolve(
    ctx: &ResolutionContext<'_>,
    request: &PendingRequest,
    words: &[U256],
) -> Result<BatchOutcome, MintError> {
    let expected = request.word_count();
    if words.len() != expected {
        return Err(MintError::UnmatchedRandomWords {
            expected,
            got: words.len(),
        });
    }

    let mode = request.mode();
    let stride = request.words_per_attempt() as usize;
    let risk = match mode {
        ResolutionMode::TwoStage => win_risk(ctx, request)?,
        ResolutionMode::SingleStage => U256::zero(),
    };

    let mut outcome = BatchOutcome::default();
    let tier_roll = |value: u32, outcome: &mut BatchOutcome| {
        if let Some((_, tier)) = ctx.tiers.select(value) {
            outcome.cumulative_tier_multiplier += tier.multiplier as u128;
        }
    };

    for attempt in words.chunks_exact(stride) {
        match mode {
            ResolutionMode::TwoStage => {
                let first = normalize(&attempt[0]);
                if risk > U256::from(first) {
                    outcome.total_wins += 1;
                    if request.target == MintTarget::NativeAsset {
                        outcome.total_prize_value = outcome
                            .total_prize_value
                            .checked_add(request.prize_value)
                            .ok_or(MintError::Overflow)?;
                    }
                } else {
                    tier_roll(normalize(&attempt[1]), &mut outcome);
                }
            }
            ResolutionMode::SingleStage => tier_roll(normalize(&attempt[0]), &mut outcome),
        }

        if request.yield_roll && ctx.yield_risk > normalize(&attempt[stride - 1]) {
            outcome.yield_wins += 1;
        }
    }

    // One conversion for the whole batch; numerators first, single floor.
    let basis_cubed = U256::from(BASIS).pow(U256::from(3u8));
    outcome.total_mint_amount = Fixed::new(outcome.cumulative_tier_multiplier)
        .mul(ctx.eth_to_mint_ratio)?
        .mul(ctx.mint_price)?
        .mul(ctx.mint_multiplier)?
        .mul(request.price_adjustment_factor)?
        .div(basis_cubed)?
        .to_u128()?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use luckymint_types::mint::{
        Address, Tier, DEFAULT_COLLECTION_MINT_PRICE, DEFAULT_ETH_TO_MINT_RATIO,
    };

    fn tiers() -> TierTable {
        TierTable::new(vec![
            Tier {
                risk: 300_000_000,
                multiplier: 1_000_000_000,
            },
            Tier {
                risk: 700_000_000,
                multiplier: 3_000_000_000,
            },
        ])
        .unwrap()
    }

    fn ctx(tiers: &TierTable) -> ResolutionContext<'_> {
        ResolutionContext {
            risk: 100_000_000,
            mint_price: DEFAULT_COLLECTION_MINT_PRICE,
            mint_multiplier: BASIS as u64,
            eth_to_mint_ratio: DEFAULT_ETH_TO_MINT_RATIO,
            yield_risk: 0,
            tiers,
        }
    }

    fn collection_request(attempts: u32) -> PendingRequest {
        PendingRequest {
            target: MintTarget::Collection(Address::from_low_u64(5)),
            minter: Address::from_low_u64(1),
            attempts,
            mint_earnings_fee_per_attempt: 0,
            price_adjustment_factor: BASIS as u64,
            prize_value: 0,
            yield_roll: false,
        }
    }

    fn words(values: &[u64]) -> Vec<U256> {
        values.iter().map(|v| U256::from(*v)).collect()
    }

    #[test]
    fn wrong_word_count_is_rejected() {
        let tiers = tiers();
        let err = resolve(&ctx(&tiers), &collection_request(3), &words(&[0; 5])).unwrap_err();
        assert_eq!(
            err,
            MintError::UnmatchedRandomWords {
                expected: 6,
                got: 5
            }
        );
    }

    #[test]
    fn collection_win_and_consolations() {
        let tiers = tiers();
        // Attempt 0 wins (0 < 10% risk); attempt 1 lands tier 0; attempt 2 lands tier 1.
        let words = words(&[0, 0, 500_000_000, 299_999_999, 100_000_000, 300_000_000]);
        let outcome = resolve(&ctx(&tiers), &collection_request(3), &words).unwrap();

        assert_eq!(outcome.total_wins, 1);
        assert_eq!(outcome.total_prize_value, 0);
        assert_eq!(outcome.cumulative_tier_multiplier, 4_000_000_000);
        // 4x * ratio * price, full multiplier, full price.
        assert_eq!(
            outcome.total_mint_amount,
            4 * DEFAULT_ETH_TO_MINT_RATIO as u128 * DEFAULT_COLLECTION_MINT_PRICE
        );
    }

    #[test]
    fn win_is_strictly_below_risk() {
        let tiers = tiers();
        let request = collection_request(1);
        let at = resolve(&ctx(&tiers), &request, &words(&[100_000_000, 0])).unwrap();
        assert_eq!(at.total_wins, 0);
        let below = resolve(&ctx(&tiers), &request, &words(&[99_999_999, 0])).unwrap();
        assert_eq!(below.total_wins, 1);
    }

    #[test]
    fn price_adjustment_scales_risk_and_reward() {
        let tiers = tiers();
        let mut request = collection_request(1);
        request.price_adjustment_factor = BASIS as u64 / 2;

        // Effective risk halves to 5%.
        let outcome = resolve(&ctx(&tiers), &request, &words(&[60_000_000, 0])).unwrap();
        assert_eq!(outcome.total_wins, 0);
        assert_eq!(
            outcome.total_mint_amount,
            DEFAULT_ETH_TO_MINT_RATIO as u128 * DEFAULT_COLLECTION_MINT_PRICE / 2
        );
    }

    #[test]
    fn words_reduce_modulo_basis() {
        let tiers = tiers();
        let request = collection_request(1);
        let wrapped = U256::from(BASIS) * U256::from(12_345u64) + U256::from(7u8);
        let outcome = resolve(&ctx(&tiers), &request, &[wrapped, U256::zero()]).unwrap();
        assert_eq!(outcome.total_wins, 1);
    }

    #[test]
    fn native_prize_risk_comes_from_fee_per_attempt() {
        let tiers = tiers();
        let request = PendingRequest {
            target: MintTarget::NativeAsset,
            minter: Address::from_low_u64(1),
            attempts: 2,
            // Fee / prize = 1/4.
            mint_earnings_fee_per_attempt: 25,
            price_adjustment_factor: BASIS as u64,
            prize_value: 100,
            yield_roll: false,
        };
        let outcome = resolve(
            &ctx(&tiers),
            &request,
            &words(&[249_999_999, 0, 250_000_000, 0]),
        )
        .unwrap();
        assert_eq!(outcome.total_wins, 1);
        assert_eq!(outcome.total_prize_value, 100);
        assert_eq!(outcome.cumulative_tier_multiplier, 1_000_000_000);
    }

    #[test]
    fn token_batches_are_single_stage() {
        let tiers = tiers();
        let request = PendingRequest {
            target: MintTarget::ConsolationToken,
            minter: Address::from_low_u64(1),
            attempts: 2,
            mint_earnings_fee_per_attempt: 0,
            price_adjustment_factor: BASIS as u64,
            prize_value: 0,
            yield_roll: false,
        };
        // A zero word would win a two-stage roll; here it only selects tier 0.
        let outcome = resolve(&ctx(&tiers), &request, &words(&[0, 999_999_999])).unwrap();
        assert_eq!(outcome.total_wins, 0);
        assert_eq!(outcome.cumulative_tier_multiplier, 4_000_000_000);
    }

    #[test]
    fn unmatched_tier_contributes_nothing() {
        let tiers = TierTable::new(vec![Tier {
            risk: 100,
            multiplier: 1_000_000_000,
        }])
        .unwrap();
        let request = collection_request(1);
        let outcome = resolve(&ctx(&tiers), &request, &words(&[999_999_999, 500])).unwrap();
        assert_eq!(outcome, BatchOutcome::default());
    }

    #[test]
    fn yield_roll_uses_last_word_of_each_attempt() {
        let tiers = tiers();
        let mut request = collection_request(2);
        request.yield_roll = true;
        let mut ctx = ctx(&tiers);
        ctx.yield_risk = 10;

        let outcome = resolve(&ctx, &request, &words(&[999_999_999, 0, 9, 999_999_999, 0, 10]))
            .unwrap();
        assert_eq!(outcome.yield_wins, 1);
        // The yield roll never moves the primary outcome.
        assert_eq!(outcome.total_wins, 0);
        assert_eq!(outcome.cumulative_tier_multiplier, 2_000_000_000);
    }

    #[test]
    fn resolution_is_deterministic() {
        let tiers = tiers();
        let request = collection_request(3);
        let words = words(&[1, 2, 3, 4, 5, 6]);
        let first = resolve(&ctx(&tiers), &request, &words).unwrap();
        let second = resolve(&ctx(&tiers), &request, &words).unwrap();
        assert_eq!(first, second);
    }
}
