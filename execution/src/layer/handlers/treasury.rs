use super::super::*;
use crate::externals::{ConsolationToken, NativeBank};
use luckymint_types::mint::{mul_div, Address, MintError, Pool, BASIS};
use tracing::{info, warn};

impl<'a, S: State, X: Externals> Layer<'a, S, X> {
    pub(in crate::layer) async fn handle_fund_consolation_fees(
        &mut self,
        amount: u128,
    ) -> Result<Vec<Event>> {
        if amount == 0 {
            return Err(MintError::ZeroAmount.into());
        }
        let mut ledger = self.get_or_init_ledger().await?;
        ledger.credit(Pool::Consolation, amount)?;
        let consolation_fees = ledger.consolation_fees;
        self.put_ledger(ledger);

        info!(amount, consolation_fees, "consolation fees funded");
        Ok(vec![Event::ConsolationFeesFunded {
            amount,
            consolation_fees,
        }])
    }

    /// Back new tokens with native value and mint them into the airdrop reserve.
    pub(in crate::layer) async fn handle_mint_airdrop(
        &mut self,
        value: u128,
    ) -> Result<Vec<Event>> {
        if value == 0 {
            return Err(MintError::ZeroAmount.into());
        }
        let mut ledger = self.get_or_init_ledger().await?;
        ledger.credit(Pool::Consolation, value)?;
        let tokens = ledger.native_to_tokens(value)?;
        self.put_ledger(ledger);

        self.externals.token().mint_airdrop(tokens)?;

        info!(value, tokens, "airdrop minted");
        Ok(vec![Event::AirdropMinted { value, tokens }])
    }

    /// Burn tokens for their native backing, less the redemption fee.
    pub(in crate::layer) async fn handle_redeem(
        &mut self,
        account: &Address,
        token_amount: u128,
    ) -> Result<Vec<Event>> {
        if token_amount == 0 {
            return Err(MintError::ZeroAmount.into());
        }
        let mut ledger = self.get_or_init_ledger().await?;
        if ledger.eth_to_mint_ratio == 0 {
            return Err(MintError::InvalidConversionRatio.into());
        }
        let payout = mul_div(
            token_amount,
            BASIS.saturating_sub(ledger.rates.redemption_fee_bp) as u128,
            BASIS as u128 * ledger.eth_to_mint_ratio as u128,
        )?;

        let available = self.externals.token().balance_of(account);
        if available < token_amount {
            return Err(MintError::InsufficientTokenBalance {
                required: token_amount,
                available,
            }
            .into());
        }
        ledger.debit(Pool::Consolation, payout)?;

        self.externals.token().burn(account, token_amount)?;
        if payout > 0 {
            if let Err(err) = self.externals.bank().transfer(account, payout) {
                warn!(%account, payout, ?err, "redemption payout rejected");
                self.externals.token().mint(account, token_amount)?;
                return Err(MintError::TransferFailed { amount: payout }.into());
            }
        }
        self.put_ledger(ledger);

        info!(%account, token_amount, payout, "tokens redeemed");
        Ok(vec![Event::Redeemed {
            account: *account,
            token_amount,
            payout,
        }])
    }

    pub(in crate::layer) async fn handle_claim_mint_earnings(
        &mut self,
        recipient: &Address,
        amount: u128,
    ) -> Result<Vec<Event>> {
        if amount == 0 {
            return Err(MintError::ZeroAmount.into());
        }
        let mut ledger = self.get_or_init_ledger().await?;
        ledger.debit(Pool::Earnings, amount)?;
        self.externals
            .bank()
            .transfer(recipient, amount)
            .map_err(|_| MintError::TransferFailed { amount })?;
        self.put_ledger(ledger);

        info!(%recipient, amount, "mint earnings claimed");
        Ok(vec![Event::MintEarningsClaimed {
            recipient: *recipient,
            amount,
        }])
    }

    /// Sweep the whole protocol fee pool.
    pub(in crate::layer) async fn handle_claim_protocol_fees(
        &mut self,
        recipient: &Address,
    ) -> Result<Vec<Event>> {
        let mut ledger = self.get_or_init_ledger().await?;
        let amount = ledger.protocol_fees;
        if amount == 0 {
            return Err(MintError::ZeroAmount.into());
        }
        ledger.debit(Pool::Protocol, amount)?;
        self.externals
            .bank()
            .transfer(recipient, amount)
            .map_err(|_| MintError::TransferFailed { amount })?;
        self.put_ledger(ledger);

        info!(%recipient, amount, "protocol fees claimed");
        Ok(vec![Event::ProtocolFeesClaimed {
            recipient: *recipient,
            amount,
        }])
    }
}
