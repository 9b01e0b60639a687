use crate::{
    externals::{
        ConsolationToken, ExternalError, Externals, NativeBank, RandomnessGateway, ReceiptLedger,
        YieldSource,
    },
    randomness::HashChain,
    Layer, Result, State,
};
use luckymint_types::{
    mint::{Address, ReceiptId, RequestId},
    Event, Instruction,
};
use primitive_types::U256;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Gateway that hands out sequential ids and records every request.
#[derive(Debug)]
pub struct MockGateway {
    pub max_words: u32,
    pub fail: bool,
    pub next_id: u64,
    pub requests: BTreeMap<RequestId, u32>,
    pub cancelled: Vec<RequestId>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self {
            max_words: 500,
            fail: false,
            next_id: 1,
            requests: BTreeMap::new(),
            cancelled: Vec::new(),
        }
    }
}

impl RandomnessGateway for MockGateway {
    fn max_words(&self) -> u32 {
        self.max_words
    }

    fn request(&mut self, word_count: u32) -> Result<RequestId, ExternalError> {
        if self.fail {
            return Err(ExternalError::Unavailable("gateway offline".to_string()));
        }
        if word_count > self.max_words {
            return Err(ExternalError::TooManyWords {
                requested: word_count,
                max: self.max_words,
            });
        }
        let id = RequestId(self.next_id);
        self.next_id += 1;
        self.requests.insert(id, word_count);
        Ok(id)
    }

    fn cancel(&mut self, id: RequestId) -> Result<(), ExternalError> {
        if self.requests.remove(&id).is_none() {
            return Err(ExternalError::Unavailable(format!("unknown request {id}")));
        }
        self.cancelled.push(id);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockToken {
    pub balances: HashMap<Address, u128>,
    pub referrals: HashMap<Address, u128>,
    pub airdropped: u128,
    pub fail_mint: bool,
}

impl MockToken {
    fn credit(&mut self, account: &Address, amount: u128) -> Result<(), ExternalError> {
        if self.fail_mint {
            return Err(ExternalError::Unavailable("token paused".to_string()));
        }
        *self.balances.entry(*account).or_default() += amount;
        Ok(())
    }
}

impl ConsolationToken for MockToken {
    fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn mint(&mut self, account: &Address, amount: u128) -> Result<(), ExternalError> {
        self.credit(account, amount)
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
        Ok(())
    }

    fn mint_referral(&mut self, referrer: &Address, amount: u128) -> Result<(), ExternalError> {
        self.credit(referrer, amount)?;
        *self.referrals.entry(*referrer).or_default() += amount;
        Ok(())
    }

    fn mint_airdrop(&mut self, amount: u128) -> Result<(), ExternalError> {
        if self.fail_mint {
            return Err(ExternalError::Unavailable("token paused".to_string()));
        }
        self.airdropped += amount;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockReceipts {
    pub minted: Vec<(Address, ReceiptId, u32)>,
    pub fail: bool,
}

impl MockReceipts {
    /// Receipts of `id` held by `account`.
    pub fn count(&self, account: &Address, id: &ReceiptId) -> u32 {
        self.minted
            .iter()
            .filter(|(holder, receipt, _)| holder == account && receipt == id)
            .map(|(_, _, count)| count)
            .sum()
    }
}

impl ReceiptLedger for MockReceipts {
    fn mint(&mut self, account: &Address, id: ReceiptId, count: u32) -> Result<(), ExternalError> {
        if self.fail {
            return Err(ExternalError::Unavailable("receipts paused".to_string()));
        }
        self.minted.push((*account, id, count));
        Ok(())
    }
}

/// Bank that pays everyone except the accounts in `rejecting`.
#[derive(Debug, Default)]
pub struct MockBank {
    pub rejecting: HashSet<Address>,
    pub paid: HashMap<Address, u128>,
}

impl MockBank {
    pub fn paid_to(&self, account: &Address) -> u128 {
        self.paid.get(account).copied().unwrap_or_default()
    }
}

impl NativeBank for MockBank {
    fn transfer(&mut self, to: &Address, amount: u128) -> Result<(), ExternalError> {
        if self.rejecting.contains(to) {
            return Err(ExternalError::Rejected(*to));
        }
        *self.paid.entry(*to).or_default() += amount;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockYield {
    pub yield_available: u128,
    pub gas_available: u128,
    pub fail: bool,
    pub claimed: HashMap<Address, u128>,
}

impl MockYield {
    fn take(&mut self, recipient: &Address, amount: u128) -> Result<u128, ExternalError> {
        if self.fail {
            return Err(ExternalError::Unavailable("yield claim reverted".to_string()));
        }
        *self.claimed.entry(*recipient).or_default() += amount;
        Ok(amount)
    }
}

impl YieldSource for MockYield {
    fn claimable_yield(&self) -> u128 {
        self.yield_available
    }

    fn claim_all_yield(&mut self, recipient: &Address) -> Result<u128, ExternalError> {
        let amount = self.take(recipient, self.yield_available)?;
        self.yield_available = 0;
        Ok(amount)
    }

    fn max_claimable_gas(&self) -> u128 {
        self.gas_available
    }

    fn claim_max_gas(&mut self, recipient: &Address) -> Result<u128, ExternalError> {
        let amount = self.take(recipient, self.gas_available)?;
        self.gas_available = 0;
        Ok(amount)
    }
}

/// In-memory collaborators. The yield roll is enabled by setting `yield_source`.
#[derive(Debug, Default)]
pub struct MockExternals {
    pub gateway: MockGateway,
    pub token: MockToken,
    pub receipts: MockReceipts,
    pub bank: MockBank,
    pub yield_source: Option<MockYield>,
}

impl Externals for MockExternals {
    type Gateway = MockGateway;
    type Token = MockToken;
    type Receipts = MockReceipts;
    type Bank = MockBank;
    type Yield = MockYield;

    fn gateway(&mut self) -> &mut MockGateway {
        &mut self.gateway
    }

    fn token(&mut self) -> &mut MockToken {
        &mut self.token
    }

    fn receipts(&mut self) -> &mut MockReceipts {
        &mut self.receipts
    }

    fn bank(&mut self) -> &mut MockBank {
        &mut self.bank
    }

    fn yield_source(&mut self) -> Option<&mut MockYield> {
        self.yield_source.as_mut()
    }
}

/// Execute `instruction` in a fresh [Layer] and apply its changes on success.
pub async fn execute<S: State, X: Externals>(
    state: &mut S,
    externals: &mut X,
    instruction: &Instruction,
) -> Result<Vec<Event>> {
    let mut layer = Layer::new(&*state, externals);
    let events = layer.execute(instruction).await?;
    let changes = layer.commit();
    state.apply(changes).await?;
    Ok(events)
}

/// Fulfil `id` in a fresh [Layer] and apply its changes on success.
pub async fn fulfill<S: State, X: Externals>(
    state: &mut S,
    externals: &mut X,
    id: RequestId,
    words: &[U256],
) -> Result<Vec<Event>> {
    let mut layer = Layer::new(&*state, externals);
    let events = layer.fulfill(id, words).await?;
    let changes = layer.commit();
    state.apply(changes).await?;
    Ok(events)
}

/// Deterministic words for `id`, as a hash-chain gateway would deliver them.
pub fn chain_words(seed: u8, id: RequestId, count: u32) -> Vec<U256> {
    HashChain::from_secret([seed; 32]).words(id, count)
}

/// A word that normalizes to exactly `value`.
pub fn word(value: u32) -> U256 {
    U256::from(value)
}
