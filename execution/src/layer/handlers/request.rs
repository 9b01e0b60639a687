use super::super::*;
use crate::externals::{ConsolationToken, NativeBank, RandomnessGateway};
use luckymint_types::{
    mint::{
        apply_bp, words_per_attempt, Address, Currency, FeeSplit, Fixed, MintError,
        PendingRequest, Pool, BASIS, MINIMUM_PRICE_PER_ATTEMPT, SCALE,
    },
    BatchSubmission, Payment,
};
use tracing::{debug, error, info, warn};

/// Native-asset price of one attempt, validated against the floor and divisibility rules.
fn price_per_attempt(
    ledger: &GlobalLedger,
    payment: &Payment,
    attempts: u32,
) -> Result<u128, MintError> {
    let check_floor = |price: u128| {
        if price < MINIMUM_PRICE_PER_ATTEMPT {
            return Err(MintError::PricePerAttemptTooLow {
                price,
                minimum: MINIMUM_PRICE_PER_ATTEMPT,
            });
        }
        Ok(())
    };

    match *payment {
        Payment::Native { value } => {
            let price = value / attempts as u128;
            check_floor(price)?;
            if value % attempts as u128 != 0 {
                return Err(MintError::IncorrectPaymentAmount { paid: value, price });
            }
            Ok(price)
        }
        Payment::Token { price_per_attempt } => {
            let price = ledger.tokens_to_native(price_per_attempt)?;
            check_floor(price)?;
            let ratio = ledger.eth_to_mint_ratio;
            if price_per_attempt % ratio as u128 != 0 {
                return Err(MintError::InvalidTokenPrice {
                    price: price_per_attempt,
                    ratio,
                });
            }
            Ok(price)
        }
    }
}

/// What was paid relative to the full price, in parts of [BASIS].
fn price_adjustment_factor(price: u128, full_price: u128) -> Result<u64, MintError> {
    if full_price == 0 {
        return Err(MintError::InvalidMintPrice);
    }
    Fixed::new(price)
        .mul(SCALE)?
        .div(full_price)?
        .mul(BASIS)?
        .div(SCALE)?
        .to_u64()
}

#[derive(Clone, Copy)]
struct Referral {
    referrer: Address,
    /// Native-asset value of the fee.
    amount: u128,
    /// Token amount minted when the batch was paid in tokens.
    tokens: u128,
}

impl<'a, S: State, X: Externals> Layer<'a, S, X> {
    pub(in crate::layer) async fn handle_submit_batch(
        &mut self,
        batch: &BatchSubmission,
    ) -> Result<Vec<Event>> {
        let BatchSubmission {
            minter,
            referrer,
            target,
            attempts,
            payment,
            prize_value,
        } = batch;
        let attempts = *attempts;

        if attempts == 0 {
            return Err(MintError::InvalidNumberOfMints.into());
        }
        if !target.is_valid() {
            return Err(MintError::InvalidTarget(*target).into());
        }

        let yield_roll = self.externals.yield_source().is_some();
        let per_attempt = words_per_attempt(target, yield_roll);
        let max_attempts = self.externals.gateway().max_words() / per_attempt;
        if attempts > max_attempts {
            return Err(MintError::BatchTooLarge {
                attempts,
                max: max_attempts,
            }
            .into());
        }

        let mut ledger = self.get_or_init_ledger().await?;
        let mut collection = self.get_or_init_collection(*target).await?;

        let price = price_per_attempt(&ledger, payment, attempts)?;
        let prize_value = match (target, prize_value) {
            (MintTarget::NativeAsset, Some(prize)) if *prize > 0 => *prize,
            (MintTarget::NativeAsset, _) | (_, Some(_)) => {
                return Err(MintError::InvalidPrizeValue.into())
            }
            (_, None) => 0,
        };

        let gross = price
            .checked_mul(attempts as u128)
            .ok_or(MintError::Overflow)?;
        let split = FeeSplit::compute(
            gross,
            target,
            &ledger.rates,
            &collection,
            referrer.is_some(),
        )?;

        // Solvency is judged against earnings before this batch is charged.
        if prize_value > 0 {
            let payout = prize_value
                .checked_mul(attempts as u128)
                .ok_or(MintError::Overflow)?;
            let available = apply_bp(
                ledger.mint_earnings,
                BASIS.saturating_sub(ledger.rates.mint_earnings_buffer_bp),
            )?;
            if payout > available {
                return Err(MintError::PrizeExceedsEarningsBuffer { payout, available }.into());
            }
        }

        let factor = price_adjustment_factor(price, collection.mint_price)?;

        // Stage the charge.
        let burn = match payment {
            Payment::Native { .. } => {
                ledger.credit(Pool::Consolation, split.consolation_credit)?;
                None
            }
            Payment::Token { price_per_attempt } => {
                // Burned tokens were already backed by the consolation pool, so only the
                // shares leaving it move.
                let outgoing = split
                    .protocol_credit
                    .checked_add(split.earnings_credit)
                    .ok_or(MintError::Overflow)?;
                ledger.debit(Pool::Consolation, outgoing)?;

                let amount = price_per_attempt
                    .checked_mul(attempts as u128)
                    .ok_or(MintError::Overflow)?;
                let available = self.externals.token().balance_of(minter);
                if available < amount {
                    return Err(MintError::InsufficientTokenBalance {
                        required: amount,
                        available,
                    }
                    .into());
                }
                Some(amount)
            }
        };
        ledger.credit(Pool::Protocol, split.protocol_credit)?;
        ledger.credit(Pool::Earnings, split.earnings_credit)?;

        let referral_tokens = match (referrer, payment.currency()) {
            (Some(_), Currency::Token) => ledger.native_to_tokens(split.referral_fee)?,
            _ => 0,
        };

        // Everything above is validated; the gateway is the first external effect.
        let word_count = attempts * per_attempt;
        let request_id = self
            .externals
            .gateway()
            .request(word_count)
            .map_err(|err| MintError::GatewayRejected(err.to_string()))?;
        let registered: Result<()> = match self.get(&Key::PendingRequest(request_id)).await {
            Ok(None) => collection.add_pending(request_id).map_err(Into::into),
            Ok(Some(_)) => Err(MintError::DuplicateRequest(request_id).into()),
            Err(err) => Err(err.into()),
        };
        if let Err(err) = registered {
            self.withdraw(request_id);
            return Err(err);
        }

        let request = PendingRequest {
            target: *target,
            minter: *minter,
            attempts,
            mint_earnings_fee_per_attempt: split.earnings_credit / attempts as u128,
            price_adjustment_factor: factor,
            prize_value,
            yield_roll,
        };
        debug!(
            request_id = %request_id,
            factor,
            fee_per_attempt = request.mint_earnings_fee_per_attempt,
            "registering pending request"
        );
        self.stage(
            Key::PendingRequest(request_id),
            Value::PendingRequest(request),
        );
        self.put_collection(collection);
        self.put_ledger(ledger);

        let referral = referrer
            .filter(|_| split.referral_fee > 0)
            .map(|referrer| Referral {
                referrer,
                amount: split.referral_fee,
                tokens: referral_tokens,
            });
        if let Err(err) = self.collect_payment(minter, referral, payment.currency(), burn) {
            self.withdraw(request_id);
            return Err(err);
        }

        let mut events = vec![Event::MintRequested {
            request_id,
            minter: *minter,
            target: *target,
            attempts,
            word_count,
            currency: payment.currency(),
            fees: split,
        }];
        if let Some(Referral {
            referrer, amount, ..
        }) = referral
        {
            events.push(Event::ReferralPaid {
                request_id,
                referrer,
                amount,
                currency: payment.currency(),
            });
        }

        info!(
            request_id = %request_id,
            target = %target,
            attempts,
            word_count,
            gross,
            currency = %payment.currency(),
            "mint requested"
        );
        Ok(events)
    }

    /// Pay the referrer, then burn a token payment. A failed burn claws the referral back.
    fn collect_payment(
        &mut self,
        minter: &Address,
        referral: Option<Referral>,
        currency: Currency,
        burn: Option<u128>,
    ) -> Result<()> {
        if let Some(Referral {
            referrer,
            amount,
            tokens,
        }) = referral
        {
            match currency {
                Currency::Native => self
                    .externals
                    .bank()
                    .transfer(&referrer, amount)
                    .map_err(|_| MintError::TransferFailed { amount })?,
                Currency::Token => self.externals.token().mint_referral(&referrer, tokens)?,
            }
        }

        let Some(amount) = burn else {
            return Ok(());
        };
        if let Err(err) = self.externals.token().burn(minter, amount) {
            if let Some(Referral {
                referrer, tokens, ..
            }) = referral.filter(|_| currency == Currency::Token)
            {
                if let Err(err) = self.externals.token().burn(&referrer, tokens) {
                    error!(%referrer, tokens, ?err, "could not claw back referral tokens");
                }
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// Cancel the randomness request of a batch that did not go through.
    fn withdraw(&mut self, id: RequestId) {
        if let Err(err) = self.externals.gateway().cancel(id) {
            warn!(request_id = %id, ?err, "could not cancel randomness request");
        }
    }
}
