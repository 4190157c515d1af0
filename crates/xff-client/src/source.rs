//! Announced-prefix sources.

use crate::RipeStatClient;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use xff_core::{Asn, Result, RotorError};

/// Supplies the usable IPv4 prefixes an Autonomous System announces.
///
/// Implementations fetch fresh data on every call; nothing is cached.
#[async_trait]
pub trait PrefixSource: Send + Sync {
    /// Usable IPv4 CIDR strings for `asn`, in registry order.
    ///
    /// Fails with `SourceUnavailable` when the registry cannot be read,
    /// `EmptyResult` when it lists nothing, and `NoUsableRanges` when
    /// nothing survives filtering.
    async fn fetch_prefixes(&self, asn: Asn) -> Result<Vec<String>>;
}

#[async_trait]
impl PrefixSource for RipeStatClient {
    async fn fetch_prefixes(&self, asn: Asn) -> Result<Vec<String>> {
        let response = self.announced_prefixes(asn).await?;
        if response.is_empty() {
            return Err(RotorError::EmptyResult);
        }

        let announced = response.prefixes();
        let usable = self.filter().apply(&announced);
        debug!(
            asn = %asn,
            announced = announced.len(),
            usable = usable.len(),
            "filtered announced prefixes"
        );

        if usable.is_empty() {
            return Err(RotorError::NoUsableRanges);
        }
        Ok(usable)
    }
}

#[async_trait]
impl<T: PrefixSource + ?Sized> PrefixSource for Arc<T> {
    async fn fetch_prefixes(&self, asn: Asn) -> Result<Vec<String>> {
        (**self).fetch_prefixes(asn).await
    }
}
