//! IPv4 CIDR arithmetic.
//!
//! Parses `a.b.c.d/n` text into a [`CidrBlock`] and samples usable host
//! addresses from it. The network address (all host bits zero) and the
//! broadcast address (all host bits one) are never returned.

use crate::{Result, RotorError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 address block in CIDR notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CidrBlock {
    base: u32,
    prefix_len: u8,
}

impl CidrBlock {
    /// Parse CIDR text such as `"24.0.0.0/12"`.
    ///
    /// The quad must have exactly four decimal octets and the mask must be
    /// in `0..=32`. Host bits set in the quad are cleared, so the stored
    /// base is always the network address.
    pub fn parse(cidr: &str) -> Result<Self> {
        let invalid = || RotorError::InvalidCidr(cidr.to_string());

        let (quad, bits) = cidr.trim().split_once('/').ok_or_else(invalid)?;
        let addr = Ipv4Addr::from_str(quad).map_err(|_| invalid())?;
        let prefix_len: u8 = bits.parse().map_err(|_| invalid())?;
        if prefix_len > 32 {
            return Err(invalid());
        }

        Ok(Self {
            base: u32::from(addr) & mask_for(prefix_len),
            prefix_len,
        })
    }

    /// Network address as a 32-bit integer
    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Prefix (mask) length
    #[must_use]
    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Number of address bits not fixed by the prefix
    #[must_use]
    pub const fn host_bits(&self) -> u32 {
        32 - self.prefix_len as u32
    }

    /// Host addresses excluding network and broadcast; zero for /31 and /32
    #[must_use]
    pub const fn usable_hosts(&self) -> u64 {
        (1u64 << self.host_bits()).saturating_sub(2)
    }

    /// Whether the block has no usable host address
    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        self.usable_hosts() == 0
    }

    /// Broadcast address (all host bits set)
    #[must_use]
    pub const fn broadcast(&self) -> u32 {
        self.base | !mask_for(self.prefix_len)
    }

    /// Whether `addr` lies inside the block, boundaries included
    #[must_use]
    pub const fn contains(&self, addr: u32) -> bool {
        addr & mask_for(self.prefix_len) == self.base
    }

    /// Draw a uniformly distributed usable host address.
    ///
    /// The offset is drawn from `1..=usable_hosts()`, which excludes both
    /// the network and the broadcast address.
    pub fn sample_host<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<u32> {
        let usable = self.usable_hosts();
        if usable == 0 {
            return Err(RotorError::DegenerateBlock(self.to_string()));
        }

        let offset = u32::try_from(rng.gen_range(1..=usable))
            .map_err(|_| RotorError::DegenerateBlock(self.to_string()))?;

        Ok(self.base + offset)
    }
}

impl fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", Ipv4Addr::from(self.base), self.prefix_len)
    }
}

impl FromStr for CidrBlock {
    type Err = RotorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CidrBlock {
    type Error = RotorError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<CidrBlock> for String {
    fn from(block: CidrBlock) -> Self {
        block.to_string()
    }
}

/// Dotted-quad text for a 32-bit address, most significant octet first
#[must_use]
pub fn to_text(addr: u32) -> String {
    Ipv4Addr::from(addr).to_string()
}

/// Parse `cidr` and draw one usable host from it
pub fn random_host<R: Rng + ?Sized>(cidr: &str, rng: &mut R) -> Result<Ipv4Addr> {
    let block = CidrBlock::parse(cidr)?;
    block.sample_host(rng).map(Ipv4Addr::from)
}

const fn mask_for(prefix_len: u8) -> u32 {
    match u32::MAX.checked_shl(32 - prefix_len as u32) {
        Some(mask) => mask,
        None => 0,
    }
}
