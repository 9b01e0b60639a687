//! In-process collaborators: token, receipt and native-asset books plus the yield vault.

use crate::gateway::SimulatedGateway;
use luckymint_execution::{
    ConsolationToken, ExternalError, Externals, NativeBank, ReceiptLedger, YieldSource,
};
use luckymint_types::mint::{Address, ReceiptId};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

#[derive(Default)]
pub struct TokenBook {
    balances: BTreeMap<Address, u128>,
    total_supply: u128,
    /// Airdropped supply not yet allocated to an account.
    airdrop_reserve: u128,
}

impl TokenBook {
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn airdrop_reserve(&self) -> u128 {
        self.airdrop_reserve
    }

    fn issue(&mut self, amount: u128) -> Result<(), ExternalError> {
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| ExternalError::Unavailable("token supply overflow".to_string()))?;
        Ok(())
    }
}

impl ConsolationToken for TokenBook {
    fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn mint(&mut self, account: &Address, amount: u128) -> Result<(), ExternalError> {
        self.issue(amount)?;
        *self.balances.entry(*account).or_default() += amount;
        Ok(())
    }

    fn burn(&mut self, account: &Address, amount: u128) -> Result<(), ExternalError> {
        let available = self.balance_of(account);
        if available < amount {
            return Err(ExternalError::InsufficientBalance {
                account: *account,
                required: amount,
                available,
            });
        }
        self.balances.insert(*account, available - amount);
        self.total_supply -= amount;
        Ok(())
    }

    fn mint_referral(&mut self, referrer: &Address, amount: u128) -> Result<(), ExternalError> {
        self.mint(referrer, amount)
    }

    fn mint_airdrop(&mut self, amount: u128) -> Result<(), ExternalError> {
        self.issue(amount)?;
        self.airdrop_reserve += amount;
        Ok(())
    }
}

#[derive(Default)]
pub struct ReceiptBook {
    holdings: BTreeMap<(Address, ReceiptId), u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReceiptBalance {
    pub id: ReceiptId,
    pub target: String,
    pub count: u32,
}

impl ReceiptBook {
    pub fn holdings(&self, account: &Address) -> Vec<ReceiptBalance> {
        self.holdings
            .range((*account, ReceiptId([0; 32]))..=(*account, ReceiptId([0xff; 32])))
            .map(|((_, id), count)| ReceiptBalance {
                id: *id,
                target: id.target().to_string(),
                count: *count,
            })
            .collect()
    }
}

impl ReceiptLedger for ReceiptBook {
    fn mint(&mut self, account: &Address, id: ReceiptId, count: u32) -> Result<(), ExternalError> {
        let held = self.holdings.entry((*account, id)).or_default();
        *held = held.saturating_add(count);
        Ok(())
    }
}

/// Outbound native-asset payments. Recipients in `rejecting` refuse every transfer.
#[derive(Default)]
pub struct Bank {
    rejecting: HashSet<Address>,
    received: BTreeMap<Address, u128>,
}

impl Bank {
    pub fn new(rejecting: HashSet<Address>) -> Self {
        Self {
            rejecting,
            received: BTreeMap::new(),
        }
    }

    pub fn received(&self, account: &Address) -> u128 {
        self.received.get(account).copied().unwrap_or_default()
    }
}

impl NativeBank for Bank {
    fn transfer(&mut self, to: &Address, amount: u128) -> Result<(), ExternalError> {
        if self.rejecting.contains(to) {
            return Err(ExternalError::Rejected(*to));
        }
        let received = self.received.entry(*to).or_default();
        *received = received.saturating_add(amount);
        Ok(())
    }
}

/// Side-channel balances swept to yield-roll winners.
pub struct YieldVault {
    claimable_yield: u128,
    claimable_gas: u128,
}

impl YieldVault {
    pub fn new(claimable_yield: u128, claimable_gas: u128) -> Self {
        Self {
            claimable_yield,
            claimable_gas,
        }
    }
}

impl YieldSource for YieldVault {
    fn claimable_yield(&self) -> u128 {
        self.claimable_yield
    }

    fn claim_all_yield(&mut self, _recipient: &Address) -> Result<u128, ExternalError> {
        Ok(std::mem::take(&mut self.claimable_yield))
    }

    fn max_claimable_gas(&self) -> u128 {
        self.claimable_gas
    }

    fn claim_max_gas(&mut self, _recipient: &Address) -> Result<u128, ExternalError> {
        Ok(std::mem::take(&mut self.claimable_gas))
    }
}

/// Every collaborator the engine drives.
pub struct Books {
    pub gateway: SimulatedGateway,
    pub token: TokenBook,
    pub receipts: ReceiptBook,
    pub bank: Bank,
    pub vault: Option<YieldVault>,
}

impl Externals for Books {
    type Gateway = SimulatedGateway;
    type Token = TokenBook;
    type Receipts = ReceiptBook;
    type Bank = Bank;
    type Yield = YieldVault;

    fn gateway(&mut self) -> &mut SimulatedGateway {
        &mut self.gateway
    }

    fn token(&mut self) -> &mut TokenBook {
        &mut self.token
    }

    fn receipts(&mut self) -> &mut ReceiptBook {
        &mut self.receipts
    }

    fn bank(&mut self) -> &mut Bank {
        &mut self.bank
    }

    fn yield_source(&mut self) -> Option<&mut YieldVault> {
        self.vault.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luckymint_types::mint::MintTarget;

    #[test]
    fn burn_beyond_balance_is_rejected() {
        let mut book = TokenBook::default();
        let account = Address::from_low_u64(1);
        book.mint(&account, 10).unwrap();
        assert!(matches!(
            book.burn(&account, 11),
            Err(ExternalError::InsufficientBalance { .. })
        ));
        book.burn(&account, 4).unwrap();
        assert_eq!(book.balance_of(&account), 6);
        assert_eq!(book.total_supply(), 6);
    }

    #[test]
    fn holdings_are_scoped_to_the_account() {
        let mut book = ReceiptBook::default();
        let alice = Address::from_low_u64(1);
        let bob = Address::from_low_u64(2);
        let target = MintTarget::Collection(Address::from_low_u64(9));
        book.mint(&alice, target.receipt_id(), 2).unwrap();
        book.mint(&alice, target.receipt_id(), 1).unwrap();
        book.mint(&bob, MintTarget::NativeAsset.receipt_id(), 1).unwrap();

        let held = book.holdings(&alice);
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].count, 3);
        assert_eq!(held[0].target, target.to_string());
    }

    #[test]
    fn rejecting_recipients_are_never_paid() {
        let account = Address::from_low_u64(3);
        let mut bank = Bank::new(HashSet::from([account]));
        assert_eq!(
            bank.transfer(&account, 5),
            Err(ExternalError::Rejected(account))
        );
        assert_eq!(bank.received(&account), 0);
    }
}
