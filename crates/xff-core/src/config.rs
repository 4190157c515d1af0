//! Rotation configuration.

use crate::{Asn, PrefixFilter, Result, RotorError};
use serde::{Deserialize, Serialize};

/// Everything the rotation pipeline needs to know about its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotorConfig {
    /// Domain whose requests get the rewritten header (subdomains included)
    pub target_domain: String,

    /// Autonomous System whose announced prefixes supply addresses
    pub asn: Asn,

    /// Identity of the installed rule
    pub rule_id: u32,

    /// Priority of the installed rule
    pub rule_priority: u32,

    /// Mask-length window for usable prefixes
    pub filter: PrefixFilter,
}

impl Default for RotorConfig {
    fn default() -> Self {
        Self {
            target_domain: String::from("doublecounter.gg"),
            asn: Asn(7922),
            rule_id: 1,
            rule_priority: 1,
            filter: PrefixFilter::default(),
        }
    }
}

impl RotorConfig {
    /// Default configuration for another domain
    #[must_use]
    pub fn for_domain(domain: impl Into<String>) -> Self {
        Self {
            target_domain: domain.into(),
            ..Self::default()
        }
    }

    /// Set the source ASN
    #[must_use]
    pub fn asn(mut self, asn: Asn) -> Self {
        self.asn = asn;
        self
    }

    /// Set the rule id
    #[must_use]
    pub fn rule_id(mut self, id: u32) -> Self {
        self.rule_id = id;
        self
    }

    /// Set the rule priority
    #[must_use]
    pub fn rule_priority(mut self, priority: u32) -> Self {
        self.rule_priority = priority;
        self
    }

    /// Set the prefix filter
    #[must_use]
    pub fn filter(mut self, filter: PrefixFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Parse from TOML text; missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| RotorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can produce an installable rule.
    pub fn validate(&self) -> Result<()> {
        let domain = self.target_domain.trim_matches('.');
        if domain.is_empty() {
            return Err(RotorError::Config("target domain is empty".into()));
        }
        if domain
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | ':' | '*' | '^' | '|'))
        {
            return Err(RotorError::Config(format!(
                "target domain is not a bare host name: {}",
                self.target_domain
            )));
        }
        if self.rule_id == 0 {
            return Err(RotorError::Config("rule id must be at least 1".into()));
        }
        if self.rule_priority == 0 {
            return Err(RotorError::Config("rule priority must be at least 1".into()));
        }
        if self.filter.min_mask > self.filter.max_mask || self.filter.max_mask > 32 {
            return Err(RotorError::Config(format!(
                "invalid mask window /{}../{}",
                self.filter.min_mask, self.filter.max_mask
            )));
        }
        Ok(())
    }
}
