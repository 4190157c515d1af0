//! Header rule installation.

use crate::engine::RuleEngine;
use std::net::Ipv4Addr;
use tracing::info;
use xff_core::{HeaderRule, Result, RotorConfig, RotorError, RuleUpdate};

/// Builds the forwarded-for rule and hands it to a [`RuleEngine`].
pub struct RuleInstaller<E> {
    engine: E,
    rule_id: u32,
    priority: u32,
    domain: String,
}

impl<E: RuleEngine> RuleInstaller<E> {
    /// Installer for the domain and rule identity in `config`
    pub fn new(engine: E, config: &RotorConfig) -> Self {
        Self {
            engine,
            rule_id: config.rule_id,
            priority: config.rule_priority,
            domain: config.target_domain.trim_matches('.').to_string(),
        }
    }

    /// The underlying engine
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Rule that sets `X-Forwarded-For: <address>` for the target domain
    #[must_use]
    pub fn build_rule(&self, address: Ipv4Addr) -> HeaderRule {
        HeaderRule::forwarded_for(self.rule_id, self.priority, &self.domain, address)
    }

    /// Replace the installed rule with one carrying `address`
    pub async fn install(&self, address: Ipv4Addr) -> Result<()> {
        let update = RuleUpdate::replace(self.build_rule(address));

        self.engine
            .update_dynamic_rules(update)
            .await
            .map_err(|e| match e {
                RotorError::RuleEngine(_) => e,
                other => RotorError::RuleEngine(other.to_string()),
            })?;

        info!(
            rule_id = self.rule_id,
            domain = %self.domain,
            address = %address,
            "installed forwarded-for rule"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryRuleEngine;

    #[tokio::test]
    async fn test_install_replaces_previous_rule() {
        let installer = RuleInstaller::new(MemoryRuleEngine::new(), &RotorConfig::default());

        installer.install(Ipv4Addr::new(24, 0, 0, 1)).await.unwrap();
        installer.install(Ipv4Addr::new(24, 0, 0, 2)).await.unwrap();

        let engine = installer.engine();
        let rules = engine.rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, 1);
        assert_eq!(
            engine.header_for("www.doublecounter.gg", "X-Forwarded-For").as_deref(),
            Some("24.0.0.2")
        );
        assert_eq!(engine.transactions().len(), 2);
        assert_eq!(engine.transactions()[1].remove_rule_ids, vec![1]);
    }

    #[tokio::test]
    async fn test_build_rule_uses_config() {
        let config = RotorConfig::for_domain(".example.com.").rule_id(5);
        let installer = RuleInstaller::new(MemoryRuleEngine::new(), &config);
        let rule = installer.build_rule(Ipv4Addr::new(10, 1, 2, 3));

        assert_eq!(rule.id, 5);
        assert_eq!(rule.priority, 1);
        assert_eq!(rule.condition.url_filter, "||example.com^");
        assert_eq!(rule.header_value("X-Forwarded-For"), Some("10.1.2.3"));
    }
}
