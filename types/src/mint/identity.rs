use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_utils::{from_hex_formatted, hex};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

use super::{CONSOLATION_TOKEN_ADDRESS, NATIVE_ASSET_ADDRESS};

/// A 20-byte account or collection address.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Self = Self([0u8; 20]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Deterministic test/demo address whose last eight bytes carry `value`.
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = from_hex_formatted(s).ok_or_else(|| format!("invalid hex address: {s}"))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|bytes: Vec<u8>| format!("address must be 20 bytes (got {})", bytes.len()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

impl Write for Address {
    fn write(&self, writer: &mut impl BufMut) {
        writer.put_slice(&self.0);
    }
}

impl Read for Address {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        if reader.remaining() < Self::SIZE {
            return Err(Error::EndOfBuffer);
        }
        let mut bytes = [0u8; 20];
        reader.copy_to_slice(&mut bytes);
        Ok(Self(bytes))
    }
}

impl FixedSize for Address {
    const SIZE: usize = 20;
}

/// What a batch of attempts mints toward.
///
/// The native asset and the consolation token are addressed through sentinel
/// addresses on the wire, but are distinct variants here so a real collection
/// can never be confused with either.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MintTarget {
    /// Attempts win native-asset prizes.
    NativeAsset,
    /// Attempts roll straight into the consolation-token tier table.
    ConsolationToken,
    /// Attempts win collectible receipts for a real collection.
    Collection(Address),
}

impl MintTarget {
    /// Map a wire address onto a target, recognizing the sentinel addresses.
    pub fn from_address(address: Address) -> Self {
        match address.0 {
            NATIVE_ASSET_ADDRESS => Self::NativeAsset,
            CONSOLATION_TOKEN_ADDRESS => Self::ConsolationToken,
            _ => Self::Collection(address),
        }
    }

    pub fn address(&self) -> Address {
        match self {
            Self::NativeAsset => Address(NATIVE_ASSET_ADDRESS),
            Self::ConsolationToken => Address(CONSOLATION_TOKEN_ADDRESS),
            Self::Collection(address) => *address,
        }
    }

    /// A collection target must be a real, non-zero, non-sentinel address.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::NativeAsset | Self::ConsolationToken => true,
            Self::Collection(address) => {
                !address.is_zero()
                    && address.0 != NATIVE_ASSET_ADDRESS
                    && address.0 != CONSOLATION_TOKEN_ADDRESS
            }
        }
    }

    /// Receipt token id for wins against this target.
    pub fn receipt_id(&self) -> ReceiptId {
        ReceiptId::for_address(&self.address())
    }
}

impl fmt::Display for MintTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NativeAsset => write!(f, "native-asset"),
            Self::ConsolationToken => write!(f, "consolation-token"),
            Self::Collection(address) => write!(f, "collection {address}"),
        }
    }
}

impl FromStr for MintTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" | "native-asset" => Ok(Self::NativeAsset),
            "token" | "consolation-token" => Ok(Self::ConsolationToken),
            _ => Ok(Self::from_address(s.parse()?)),
        }
    }
}

impl Serialize for MintTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.address().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MintTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

impl Write for MintTarget {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::NativeAsset => 0u8.write(writer),
            Self::ConsolationToken => 1u8.write(writer),
            Self::Collection(address) => {
                2u8.write(writer);
                address.write(writer);
            }
        }
    }
}

impl Read for MintTarget {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        match kind {
            0 => Ok(Self::NativeAsset),
            1 => Ok(Self::ConsolationToken),
            2 => Ok(Self::Collection(Address::read(reader)?)),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for MintTarget {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Collection(_) => Address::SIZE,
                _ => 0,
            }
    }
}

/// Opaque identifier handed back by the randomness gateway.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Write for RequestId {
    fn write(&self, writer: &mut impl BufMut) {
        self.0.write(writer);
    }
}

impl Read for RequestId {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self(u64::read(reader)?))
    }
}

impl FixedSize for RequestId {
    const SIZE: usize = u64::SIZE;
}

/// Token id of a collectible receipt. The target address sits in the low 20 bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReceiptId(pub [u8; 32]);

impl ReceiptId {
    pub fn for_address(address: &Address) -> Self {
        let mut bytes = [0u8; 32];
        bytes[12..].copy_from_slice(&address.0);
        Self(bytes)
    }

    /// Recover the target identity encoded in this id.
    pub fn target(&self) -> MintTarget {
        let mut address = [0u8; 20];
        address.copy_from_slice(&self.0[12..]);
        MintTarget::from_address(Address(address))
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex(&self.0))
    }
}

impl fmt::Debug for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Serialize for ReceiptId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
