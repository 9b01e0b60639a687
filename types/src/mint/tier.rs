use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use serde::{Deserialize, Serialize};

use super::{MintError, BASIS, MAX_TIERS};

/// A consolation bucket: probability mass (parts of [BASIS]) and payout multiplier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub risk: u32,
    pub multiplier: u64,
}

impl Write for Tier {
    fn write(&self, writer: &mut impl BufMut) {
        self.risk.write(writer);
        self.multiplier.write(writer);
    }
}

impl Read for Tier {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            risk: u32::read(reader)?,
            multiplier: u64::read(reader)?,
        })
    }
}

impl FixedSize for Tier {
    const SIZE: usize = u32::SIZE + u64::SIZE;
}

/// Which tier table a lookup runs against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    /// Collection and native-asset consolations.
    Consolation,
    /// Batches that mint the consolation token directly.
    MintToken,
}

impl Write for TierKind {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Consolation => 0u8.write(writer),
            Self::MintToken => 1u8.write(writer),
        }
    }
}

impl Read for TierKind {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Consolation),
            1 => Ok(Self::MintToken),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for TierKind {
    const SIZE: usize = u8::SIZE;
}

/// Ordered tiers walked by cumulative risk.
///
/// Individual risks are bounded by [BASIS] but their sum is not: a table whose
/// cumulative risk stays below `BASIS` simply leaves the top of the range unmatched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Tier>", into = "Vec<Tier>")]
pub struct TierTable(Vec<Tier>);

impl TierTable {
    pub fn new(tiers: Vec<Tier>) -> Result<Self, MintError> {
        if tiers.len() > MAX_TIERS {
            return Err(MintError::InvalidTierTable);
        }
        if let Some(tier) = tiers.iter().find(|tier| tier.risk > BASIS) {
            return Err(MintError::BasisExceeded {
                value: tier.risk as u64,
                basis: BASIS,
            });
        }
        Ok(Self(tiers))
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all tier risks.
    pub fn cumulative_risk(&self) -> u64 {
        self.0.iter().map(|tier| tier.risk as u64).sum()
    }

    /// First tier whose cumulative risk strictly exceeds `value`.
    pub fn select(&self, value: u32) -> Option<(usize, &Tier)> {
        let mut cumulative = 0u64;
        for (index, tier) in self.0.iter().enumerate() {
            cumulative += tier.risk as u64;
            if cumulative > value as u64 {
                return Some((index, tier));
            }
        }
        None
    }
}

impl TryFrom<Vec<Tier>> for TierTable {
    type Error = MintError;

    fn try_from(tiers: Vec<Tier>) -> Result<Self, Self::Error> {
        Self::new(tiers)
    }
}

impl From<TierTable> for Vec<Tier> {
    fn from(table: TierTable) -> Self {
        table.0
    }
}

impl Write for TierTable {
    fn write(&self, writer: &mut impl BufMut) {
        (self.0.len() as u32).write(writer);
        for tier in &self.0 {
            tier.write(writer);
        }
    }
}

impl Read for TierTable {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let len = u32::read(reader)? as usize;
        if len > MAX_TIERS {
            return Err(Error::Invalid("TierTable", "too many tiers"));
        }
        let mut tiers = Vec::with_capacity(len);
        for _ in 0..len {
            tiers.push(Tier::read(reader)?);
        }
        Self::new(tiers).map_err(|_| Error::Invalid("TierTable", "tier risk exceeds basis"))
    }
}

impl EncodeSize for TierTable {
    fn encode_size(&self) -> usize {
        u32::SIZE + self.0.len() * Tier::SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt, Encode};

    fn table() -> TierTable {
        TierTable::new(vec![
            Tier {
                risk: 300_000_000,
                multiplier: 1_000_000_000,
            },
            Tier {
                risk: 700_000_000,
                multiplier: 2_000_000_000,
            },
        ])
        .unwrap()
    }

    #[test]
    fn select_uses_strict_cumulative_boundary() {
        let table = table();
        assert_eq!(table.select(0).map(|(i, _)| i), Some(0));
        assert_eq!(table.select(299_999_999).map(|(i, _)| i), Some(0));
        assert_eq!(table.select(300_000_000).map(|(i, _)| i), Some(1));
        assert_eq!(table.select(999_999_999).map(|(i, _)| i), Some(1));
    }

    #[test]
    fn underfilled_table_leaves_values_unmatched() {
        let table = TierTable::new(vec![Tier {
            risk: 500_000_000,
            multiplier: 1,
        }])
        .unwrap();
        assert!(table.select(499_999_999).is_some());
        assert!(table.select(500_000_000).is_none());
        assert!(TierTable::default().select(0).is_none());
    }

    #[test]
    fn rejects_risk_above_basis() {
        let err = TierTable::new(vec![Tier {
            risk: BASIS + 1,
            multiplier: 1,
        }])
        .unwrap_err();
        assert_eq!(
            err,
            MintError::BasisExceeded {
                value: BASIS as u64 + 1,
                basis: BASIS
            }
        );
    }

    #[test]
    fn rejects_oversized_tables() {
        let tiers = vec![Tier { risk: 1, multiplier: 1 }; MAX_TIERS + 1];
        assert_eq!(TierTable::new(tiers), Err(MintError::InvalidTierTable));
    }

    #[test]
    fn codec_preserves_order() {
        let table = table();
        let decoded = TierTable::decode(table.encode()).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn serde_validates() {
        let json = format!(r#"[{{"risk":{},"multiplier":1}}]"#, BASIS + 1);
        assert!(serde_json::from_str::<TierTable>(&json).is_err());
        let ok: TierTable = serde_json::from_str(r#"[{"risk":5,"multiplier":9}]"#).unwrap();
        assert_eq!(ok.cumulative_risk(), 5);
    }
}
