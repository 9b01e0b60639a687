use super::super::*;
use crate::{
    externals::{ConsolationToken, NativeBank, ReceiptLedger, YieldSource},
    resolver::{resolve, BatchOutcome, ResolutionContext},
};
use luckymint_types::{
    mint::{Address, MintError, PendingRequest, Pool, ResolutionMode},
    FallbackReason,
};
use tracing::{debug, error, info, warn};

impl<'a, S: State, X: Externals> Layer<'a, S, X> {
    pub(in crate::layer) async fn handle_fulfill(
        &mut self,
        id: RequestId,
        words: &[U256],
    ) -> Result<Vec<Event>> {
        let Some(request) = state::pending_request(&*self, id).await? else {
            warn!(request_id = %id, "fulfilment for unknown request");
            return Err(MintError::UnknownRequest(id).into());
        };

        let mut ledger = self.get_or_init_ledger().await?;
        let mut collection = self.get_or_init_collection(request.target).await?;
        let kind = match request.mode() {
            ResolutionMode::TwoStage => TierKind::Consolation,
            ResolutionMode::SingleStage => TierKind::MintToken,
        };
        let tiers = self.get_tiers(kind).await?;

        let ctx = ResolutionContext {
            risk: collection.risk,
            mint_price: collection.mint_price,
            mint_multiplier: collection.mint_multiplier,
            eth_to_mint_ratio: ledger.eth_to_mint_ratio,
            yield_risk: ledger.yield_risk,
            tiers: &tiers,
        };
        let outcome = resolve(&ctx, &request, words).inspect_err(|err| {
            warn!(request_id = %id, ?err, "rejecting fulfilment");
        })?;
        debug!(
            request_id = %id,
            wins = outcome.total_wins,
            multiplier = outcome.cumulative_tier_multiplier,
            "resolved batch"
        );

        // Consume the request before any payout.
        collection.remove_pending(&id);
        self.unstage(Key::PendingRequest(id));

        if outcome.total_mint_amount > 0 {
            self.externals
                .token()
                .mint(&request.minter, outcome.total_mint_amount)?;
        }

        // A failed payout leaves the request pending for a retry; reverse the mint.
        let escrowed = match self.pay_wins(id, &request, &outcome, &mut ledger) {
            Ok(escrowed) => escrowed,
            Err(err) => {
                if outcome.total_mint_amount > 0 {
                    if let Err(err) = self
                        .externals
                        .token()
                        .burn(&request.minter, outcome.total_mint_amount)
                    {
                        error!(
                            request_id = %id,
                            amount = outcome.total_mint_amount,
                            ?err,
                            "could not reverse consolation mint"
                        );
                    }
                }
                return Err(err);
            }
        };
        let mut events: Vec<Event> = escrowed.into_iter().collect();

        let side_channel = if request.yield_roll {
            Some(self.claim_side_channel(id, &request.minter, outcome.yield_wins))
        } else {
            None
        };

        self.put_collection(collection);
        self.put_ledger(ledger);

        info!(
            request_id = %id,
            target = %request.target,
            attempts = request.attempts,
            wins = outcome.total_wins,
            mint_amount = outcome.total_mint_amount,
            prize = outcome.total_prize_value,
            "mint resolved"
        );
        events.insert(
            0,
            Event::MintResult {
                request_id: id,
                minter: request.minter,
                target: request.target,
                attempts: request.attempts,
                total_mint_amount: outcome.total_mint_amount,
                total_wins: outcome.total_wins,
                total_prize_value: outcome.total_prize_value,
                total_side_channel_amount: side_channel,
            },
        );
        Ok(events)
    }

    /// Hand out what the wins are worth for the request's target.
    fn pay_wins(
        &mut self,
        id: RequestId,
        request: &PendingRequest,
        outcome: &BatchOutcome,
        ledger: &mut GlobalLedger,
    ) -> Result<Option<Event>> {
        if outcome.total_wins == 0 {
            return Ok(None);
        }
        match request.target {
            MintTarget::NativeAsset => self.settle_prize(id, request, outcome, ledger),
            MintTarget::Collection(_) => {
                self.externals.receipts().mint(
                    &request.minter,
                    request.target.receipt_id(),
                    outcome.total_wins,
                )?;
                Ok(None)
            }
            MintTarget::ConsolationToken => Ok(None),
        }
    }

    /// Pay a native-asset prize from earnings, or escrow it as receipts when it
    /// cannot be pushed.
    fn settle_prize(
        &mut self,
        id: RequestId,
        request: &PendingRequest,
        outcome: &BatchOutcome,
        ledger: &mut GlobalLedger,
    ) -> Result<Option<Event>> {
        let amount = outcome.total_prize_value;
        let reason = if ledger.mint_earnings < amount {
            warn!(
                request_id = %id,
                amount,
                earnings = ledger.mint_earnings,
                "earnings cannot cover prize"
            );
            FallbackReason::InsufficientEarnings
        } else {
            ledger.debit(Pool::Earnings, amount)?;
            match self.externals.bank().transfer(&request.minter, amount) {
                Ok(()) => return Ok(None),
                Err(err) => {
                    warn!(request_id = %id, minter = %request.minter, ?err, "prize transfer rejected");
                    ledger.credit(Pool::Earnings, amount)?;
                    FallbackReason::TransferRejected
                }
            }
        };

        self.externals.receipts().mint(
            &request.minter,
            request.target.receipt_id(),
            outcome.total_wins,
        )?;
        Ok(Some(Event::PrizeEscrowed {
            request_id: id,
            minter: request.minter,
            amount,
            receipts: outcome.total_wins,
            reason,
        }))
    }

    /// Sweep side-channel yield and gas to the minter. Failures here never fail the
    /// fulfilment.
    fn claim_side_channel(&mut self, id: RequestId, minter: &Address, wins: u32) -> u128 {
        if wins == 0 {
            return 0;
        }
        let Some(source) = self.externals.yield_source() else {
            return 0;
        };

        let mut total: u128 = 0;
        if source.claimable_yield() > 0 {
            match source.claim_all_yield(minter) {
                Ok(amount) => total = total.saturating_add(amount),
                Err(err) => warn!(request_id = %id, ?err, "yield claim failed"),
            }
        }
        if source.max_claimable_gas() > 0 {
            match source.claim_max_gas(minter) {
                Ok(amount) => total = total.saturating_add(amount),
                Err(err) => warn!(request_id = %id, ?err, "gas claim failed"),
            }
        }
        total
    }
}
