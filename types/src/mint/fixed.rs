//! Fixed-point helpers.
//!
//! All protocol amounts are integers. Ratios are expressed against [BASIS] and every
//! multi-step computation multiplies all numerators first and floors exactly once at the
//! end. Intermediates are widened to 256 bits so that ordering never has to be traded
//! for headroom.

use primitive_types::U256;

use super::{MintError, BASIS};

/// A 256-bit intermediate with checked arithmetic and floor division.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fixed(U256);

impl Fixed {
    pub fn new(value: impl Into<U256>) -> Self {
        Self(value.into())
    }

    pub fn mul(self, rhs: impl Into<U256>) -> Result<Self, MintError> {
        self.0
            .checked_mul(rhs.into())
            .map(Self)
            .ok_or(MintError::Overflow)
    }

    /// Floor division.
    pub fn div(self, rhs: impl Into<U256>) -> Result<Self, MintError> {
        let rhs = rhs.into();
        if rhs.is_zero() {
            return Err(MintError::DivisionByZero);
        }
        Ok(Self(self.0 / rhs))
    }

    pub fn raw(&self) -> U256 {
        self.0
    }

    pub fn to_u128(self) -> Result<u128, MintError> {
        if self.0 > U256::from(u128::MAX) {
            return Err(MintError::Overflow);
        }
        Ok(self.0.low_u128())
    }

    pub fn to_u64(self) -> Result<u64, MintError> {
        if self.0 > U256::from(u64::MAX) {
            return Err(MintError::Overflow);
        }
        Ok(self.0.low_u64())
    }
}

/// `value * numerator / denominator`, floored.
pub fn mul_div(value: u128, numerator: u128, denominator: u128) -> Result<u128, MintError> {
    Fixed::new(value)
        .mul(numerator)?
        .div(denominator)?
        .to_u128()
}

/// Apply a rate expressed in parts of [BASIS].
pub fn apply_bp(value: u128, rate_bp: u32) -> Result<u128, MintError> {
    mul_div(value, rate_bp as u128, BASIS as u128)
}

/// Reduce a random word to a uniform value in `[0, BASIS)`.
pub fn normalize(word: &U256) -> u32 {
    (word % U256::from(BASIS)).low_u64() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_floors() {
        assert_eq!(mul_div(10, 1, 3).unwrap(), 3);
        assert_eq!(mul_div(999, 1, 1000).unwrap(), 0);
        assert_eq!(apply_bp(1_000, 500_000_000).unwrap(), 500);
    }

    #[test]
    fn wide_intermediates_do_not_overflow() {
        // u128::MAX * BASIS only fits in 256 bits.
        let value = mul_div(u128::MAX, BASIS as u128, BASIS as u128).unwrap();
        assert_eq!(value, u128::MAX);
    }

    #[test]
    fn narrowing_is_checked() {
        let too_big = Fixed::new(u128::MAX).mul(2u8).unwrap();
        assert_eq!(too_big.to_u128(), Err(MintError::Overflow));
        assert_eq!(Fixed::new(1u8).div(0u8), Err(MintError::DivisionByZero));
    }

    #[test]
    fn normalize_wraps_at_basis() {
        assert_eq!(normalize(&U256::from(BASIS)), 0);
        assert_eq!(normalize(&U256::from(BASIS as u64 + 7)), 7);
        assert_eq!(normalize(&U256::MAX), (U256::MAX % U256::from(BASIS)).low_u64() as u32);
    }
}
