use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;

use super::{
    check_bp, MintError, MintTarget, RequestId, DEFAULT_COLLECTION_MINT_MULTIPLIER,
    DEFAULT_COLLECTION_MINT_PRICE, DEFAULT_COLLECTION_RISK, MAX_PENDING_REQUESTS,
};

/// Per-target configuration plus the set of requests still awaiting randomness.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub target: MintTarget,
    pub mint_price: u128,
    pub risk: u32,
    pub mint_multiplier: u64,
    pub referral_fee_bp: u32,
    #[serde(default)]
    pub mint_fee_distribution_ratio_bp: u32,
    #[serde(
        default,
        skip_deserializing,
        serialize_with = "serialize_sorted"
    )]
    pending_requests: HashSet<RequestId>,
}

fn serialize_sorted<S: Serializer>(
    set: &HashSet<RequestId>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut ids: Vec<_> = set.iter().copied().collect();
    ids.sort();
    ids.serialize(serializer)
}

impl CollectionConfig {
    /// Configuration assumed for a target nobody has configured yet.
    pub fn unconfigured(target: MintTarget, default_referral_fee_bp: u32) -> Self {
        Self {
            target,
            mint_price: DEFAULT_COLLECTION_MINT_PRICE,
            risk: DEFAULT_COLLECTION_RISK,
            mint_multiplier: DEFAULT_COLLECTION_MINT_MULTIPLIER,
            referral_fee_bp: default_referral_fee_bp,
            mint_fee_distribution_ratio_bp: 0,
            pending_requests: HashSet::new(),
        }
    }

    pub fn has_pending_requests(&self) -> bool {
        !self.pending_requests.is_empty()
    }

    pub fn pending_requests(&self) -> &HashSet<RequestId> {
        &self.pending_requests
    }

    pub fn add_pending(&mut self, id: RequestId) -> Result<(), MintError> {
        if !self.pending_requests.insert(id) {
            return Err(MintError::DuplicateRequest(id));
        }
        Ok(())
    }

    /// Returns whether `id` was present.
    pub fn remove_pending(&mut self, id: &RequestId) -> bool {
        self.pending_requests.remove(id)
    }

    fn ensure_idle(&self) -> Result<(), MintError> {
        if self.has_pending_requests() {
            return Err(MintError::PendingRequests(self.target));
        }
        Ok(())
    }

    pub fn set_mint_price(&mut self, price: u128) -> Result<(), MintError> {
        if price == 0 {
            return Err(MintError::InvalidMintPrice);
        }
        self.mint_price = price;
        Ok(())
    }

    pub fn set_risk(&mut self, risk: u32) -> Result<(), MintError> {
        check_bp(risk)?;
        self.ensure_idle()?;
        self.risk = risk;
        Ok(())
    }

    pub fn set_mint_multiplier(&mut self, multiplier: u64) -> Result<(), MintError> {
        self.ensure_idle()?;
        self.mint_multiplier = multiplier;
        Ok(())
    }

    pub fn set_referral_fee_bp(&mut self, fee_bp: u32) -> Result<(), MintError> {
        check_bp(fee_bp)?;
        self.referral_fee_bp = fee_bp;
        Ok(())
    }

    pub fn set_mint_fee_distribution_ratio_bp(&mut self, ratio_bp: u32) -> Result<(), MintError> {
        check_bp(ratio_bp)?;
        self.ensure_idle()?;
        self.mint_fee_distribution_ratio_bp = ratio_bp;
        Ok(())
    }
}

impl Write for CollectionConfig {
    fn write(&self, writer: &mut impl BufMut) {
        self.target.write(writer);
        self.mint_price.write(writer);
        self.risk.write(writer);
        self.mint_multiplier.write(writer);
        self.referral_fee_bp.write(writer);
        self.mint_fee_distribution_ratio_bp.write(writer);

        let mut pending: Vec<_> = self.pending_requests.iter().collect();
        pending.sort();
        (pending.len() as u32).write(writer);
        for id in pending {
            id.write(writer);
        }
    }
}

impl Read for CollectionConfig {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let target = MintTarget::read(reader)?;
        let mint_price = u128::read(reader)?;
        let risk = u32::read(reader)?;
        let mint_multiplier = u64::read(reader)?;
        let referral_fee_bp = u32::read(reader)?;
        let mint_fee_distribution_ratio_bp = u32::read(reader)?;

        let len = u32::read(reader)? as usize;
        if len > MAX_PENDING_REQUESTS {
            return Err(Error::Invalid("CollectionConfig", "too many pending requests"));
        }
        let mut pending_requests = HashSet::with_capacity(len);
        for _ in 0..len {
            if !pending_requests.insert(RequestId::read(reader)?) {
                return Err(Error::Invalid("CollectionConfig", "duplicate pending request"));
            }
        }

        Ok(Self {
            target,
            mint_price,
            risk,
            mint_multiplier,
            referral_fee_bp,
            mint_fee_distribution_ratio_bp,
            pending_requests,
        })
    }
}

impl EncodeSize for CollectionConfig {
    fn encode_size(&self) -> usize {
        self.target.encode_size()
            + u128::SIZE
            + u32::SIZE
            + u64::SIZE
            + u32::SIZE
            + u32::SIZE
            + u32::SIZE
            + self.pending_requests.len() * RequestId::SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mint::{Address, BASIS};
    use commonware_codec::{DecodeExt, Encode};

    fn collection() -> CollectionConfig {
        CollectionConfig::unconfigured(MintTarget::Collection(Address::from_low_u64(9)), 0)
    }

    #[test]
    fn risk_change_is_gated_while_requests_are_pending() {
        let mut config = collection();
        config.add_pending(RequestId(1)).unwrap();

        assert_eq!(
            config.set_risk(5),
            Err(MintError::PendingRequests(config.target))
        );
        assert!(config.set_mint_multiplier(2).is_err());
        assert!(config.set_mint_fee_distribution_ratio_bp(1).is_err());
        assert_eq!(config.risk, DEFAULT_COLLECTION_RISK);

        // Price and referral are not odds-bearing.
        config.set_mint_price(42).unwrap();
        config.set_referral_fee_bp(7).unwrap();

        assert!(config.remove_pending(&RequestId(1)));
        config.set_risk(5).unwrap();
        assert_eq!(config.risk, 5);
    }

    #[test]
    fn duplicate_pending_id_is_rejected() {
        let mut config = collection();
        config.add_pending(RequestId(3)).unwrap();
        assert_eq!(
            config.add_pending(RequestId(3)),
            Err(MintError::DuplicateRequest(RequestId(3)))
        );
        assert!(!config.remove_pending(&RequestId(4)));
    }

    #[test]
    fn setters_validate_against_basis() {
        let mut config = collection();
        assert!(config.set_risk(BASIS + 1).is_err());
        assert!(config.set_referral_fee_bp(BASIS + 1).is_err());
        assert_eq!(config.set_mint_price(0), Err(MintError::InvalidMintPrice));
    }

    #[test]
    fn pending_set_encodes_deterministically() {
        let mut a = collection();
        let mut b = collection();
        for id in [5, 1, 9] {
            a.add_pending(RequestId(id)).unwrap();
        }
        for id in [9, 5, 1] {
            b.add_pending(RequestId(id)).unwrap();
        }
        assert_eq!(a.encode(), b.encode());

        let decoded = CollectionConfig::decode(a.encode()).unwrap();
        assert_eq!(decoded, a);
    }

    #[test]
    fn genesis_json_cannot_smuggle_pending_requests() {
        let config = collection();
        let mut json = serde_json::to_value(&config).unwrap();
        json["pending_requests"] = serde_json::json!([1, 2]);
        let parsed: CollectionConfig = serde_json::from_value(json).unwrap();
        assert!(!parsed.has_pending_requests());
    }
}
