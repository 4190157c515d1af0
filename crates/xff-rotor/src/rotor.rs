//! Rotation orchestrator.

use crate::engine::RuleEngine;
use crate::installer::RuleInstaller;
use rand::Rng;
use std::net::Ipv4Addr;
use tracing::{debug, instrument, warn};
use xff_client::PrefixSource;
use xff_core::{CidrBlock, Result, RotorConfig, RotorError};

/// Fetches announced prefixes, derives a random host from one of them and
/// installs it as the forwarded-for rule.
///
/// Holds no state between rotations; the only durable state is the rule
/// kept by the engine. Overlapping rotations are not ordered and the last
/// engine write wins.
pub struct Rotor<S, E> {
    pub(crate) config: RotorConfig,
    source: S,
    installer: RuleInstaller<E>,
}

impl<S: PrefixSource, E: RuleEngine> Rotor<S, E> {
    /// Create an orchestrator; fails with `Config` if `config` is invalid
    pub fn new(config: RotorConfig, source: S, engine: E) -> Result<Self> {
        config.validate()?;
        let installer = RuleInstaller::new(engine, &config);
        Ok(Self {
            config,
            source,
            installer,
        })
    }

    /// Active configuration
    pub const fn config(&self) -> &RotorConfig {
        &self.config
    }

    /// The prefix source
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// The rule engine
    pub const fn engine(&self) -> &E {
        self.installer.engine()
    }

    /// Run one rotation, logging instead of returning failures.
    ///
    /// On failure the previously installed rule, if any, stays in effect.
    pub async fn rotate(&self) {
        match self.try_rotate().await {
            Ok(address) => debug!(address = %address, "rotation complete"),
            Err(e) => warn!(
                error = %e,
                kind = e.kind(),
                "address rotation failed, keeping previous rule"
            ),
        }
    }

    /// Run one rotation and return the installed address
    #[instrument(skip(self), fields(domain = %self.config.target_domain, asn = %self.config.asn))]
    pub async fn try_rotate(&self) -> Result<Ipv4Addr> {
        let fetched = self.source.fetch_prefixes(self.config.asn).await?;
        let prefixes = self.config.filter.apply(&fetched);
        if prefixes.is_empty() {
            debug!(fetched = fetched.len(), "no prefix inside the configured mask window");
            return Err(RotorError::NoUsableRanges);
        }

        let (block, address) = {
            let mut rng = rand::thread_rng();
            pick_address(prefixes, &mut rng)?
        };
        debug!(block = %block, address = %address, "derived address");

        self.installer.install(address).await?;
        Ok(address)
    }
}

/// Pick a prefix uniformly and sample a host from it.
///
/// Prefixes that fail to parse or have no usable hosts are dropped and the
/// pick repeats over the rest; the last such error is returned once none
/// remain.
pub(crate) fn pick_address<R: Rng + ?Sized>(
    mut candidates: Vec<String>,
    rng: &mut R,
) -> Result<(CidrBlock, Ipv4Addr)> {
    let mut last_err = None;

    while !candidates.is_empty() {
        let cidr = candidates.swap_remove(rng.gen_range(0..candidates.len()));

        let sampled = CidrBlock::parse(&cidr)
            .and_then(|block| block.sample_host(rng).map(|host| (block, Ipv4Addr::from(host))));

        match sampled {
            Ok(pair) => return Ok(pair),
            Err(e) => {
                warn!(cidr = %cidr, error = %e, "skipping unusable prefix");
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or(RotorError::NoUsableRanges))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_pick_address_within_block() {
        let mut rng = StdRng::seed_from_u64(42);
        let (block, address) = pick_address(strings(&["24.0.0.0/12"]), &mut rng).unwrap();

        assert_eq!(block.to_string(), "24.0.0.0/12");
        let n = u32::from(address);
        assert!(n > block.base() && n < block.broadcast());
    }

    #[test]
    fn test_pick_address_skips_degenerate_and_invalid() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..50 {
            let (block, _) = pick_address(
                strings(&["10.0.0.0/31", "garbage", "73.0.0.0/16", "10.0.0.9/32"]),
                &mut rng,
            )
            .unwrap();
            assert_eq!(block.to_string(), "73.0.0.0/16");
        }
    }

    #[test]
    fn test_pick_address_all_degenerate() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = pick_address(strings(&["10.0.0.0/31", "10.0.0.0/32"]), &mut rng).unwrap_err();
        assert!(matches!(err, RotorError::DegenerateBlock(_)));

        let err = pick_address(strings(&["nope"]), &mut rng).unwrap_err();
        assert!(matches!(err, RotorError::InvalidCidr(_)));

        let err = pick_address(Vec::new(), &mut rng).unwrap_err();
        assert!(matches!(err, RotorError::NoUsableRanges));
    }

    #[test]
    fn test_pick_address_reaches_every_prefix() {
        let mut rng = StdRng::seed_from_u64(9);
        let prefixes = strings(&["24.0.0.0/12", "68.32.0.0/11", "73.0.0.0/16"]);
        let mut seen = std::collections::HashSet::new();

        for _ in 0..300 {
            let (block, _) = pick_address(prefixes.clone(), &mut rng).unwrap();
            seen.insert(block.to_string());
        }
        assert_eq!(seen.len(), 3);
    }
}
