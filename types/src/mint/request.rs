use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use serde::{Deserialize, Serialize};

use super::{
    Address, MintTarget, SINGLE_STAGE_WORDS_PER_ATTEMPT, TWO_STAGE_WORDS_PER_ATTEMPT,
    YIELD_ROLL_WORDS_PER_ATTEMPT,
};

/// How each attempt of a batch consumes randomness.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Win roll, then a tier roll on a loss.
    TwoStage,
    /// Tier roll only.
    SingleStage,
}

impl ResolutionMode {
    pub fn for_target(target: &MintTarget) -> Self {
        match target {
            MintTarget::ConsolationToken => Self::SingleStage,
            MintTarget::NativeAsset | MintTarget::Collection(_) => Self::TwoStage,
        }
    }
}

/// Random words one attempt consumes against `target`.
pub fn words_per_attempt(target: &MintTarget, yield_roll: bool) -> u32 {
    let base = match ResolutionMode::for_target(target) {
        ResolutionMode::TwoStage => TWO_STAGE_WORDS_PER_ATTEMPT,
        ResolutionMode::SingleStage => SINGLE_STAGE_WORDS_PER_ATTEMPT,
    };
    if yield_roll {
        base + YIELD_ROLL_WORDS_PER_ATTEMPT
    } else {
        base
    }
}

/// A charged batch awaiting its randomness.
///
/// Written once when the batch is paid for and deleted once when its words arrive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub target: MintTarget,
    pub minter: Address,
    pub attempts: u32,
    pub mint_earnings_fee_per_attempt: u128,
    pub price_adjustment_factor: u64,
    /// Zero unless the batch plays for native-asset prizes.
    pub prize_value: u128,
    pub yield_roll: bool,
}

impl PendingRequest {
    pub fn mode(&self) -> ResolutionMode {
        ResolutionMode::for_target(&self.target)
    }

    pub fn words_per_attempt(&self) -> u32 {
        words_per_attempt(&self.target, self.yield_roll)
    }

    /// Exact number of random words the fulfilment must carry.
    pub fn word_count(&self) -> usize {
        self.attempts as usize * self.words_per_attempt() as usize
    }
}

impl Write for PendingRequest {
    fn write(&self, writer: &mut impl BufMut) {
        self.target.write(writer);
        self.minter.write(writer);
        self.attempts.write(writer);
        self.mint_earnings_fee_per_attempt.write(writer);
        self.price_adjustment_factor.write(writer);
        self.prize_value.write(writer);
        self.yield_roll.write(writer);
    }
}

impl Read for PendingRequest {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            target: MintTarget::read(reader)?,
            minter: Address::read(reader)?,
            attempts: u32::read(reader)?,
            mint_earnings_fee_per_attempt: u128::read(reader)?,
            price_adjustment_factor: u64::read(reader)?,
            prize_value: u128::read(reader)?,
            yield_roll: bool::read(reader)?,
        })
    }
}

impl EncodeSize for PendingRequest {
    fn encode_size(&self) -> usize {
        self.target.encode_size()
            + Address::SIZE
            + u32::SIZE
            + u128::SIZE
            + u64::SIZE
            + u128::SIZE
            + bool::SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_counts_follow_mode() {
        let collection = MintTarget::Collection(Address::from_low_u64(1));
        assert_eq!(words_per_attempt(&collection, false), 2);
        assert_eq!(words_per_attempt(&MintTarget::NativeAsset, true), 3);
        assert_eq!(words_per_attempt(&MintTarget::ConsolationToken, false), 1);
        assert_eq!(words_per_attempt(&MintTarget::ConsolationToken, true), 2);

        let request = PendingRequest {
            target: MintTarget::NativeAsset,
            minter: Address::from_low_u64(2),
            attempts: 3,
            mint_earnings_fee_per_attempt: 0,
            price_adjustment_factor: 0,
            prize_value: 1,
            yield_roll: false,
        };
        assert_eq!(request.mode(), ResolutionMode::TwoStage);
        assert_eq!(request.word_count(), 6);
    }
}
