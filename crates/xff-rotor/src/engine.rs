//! Rule engine seam.
//!
//! The engine that actually rewrites traffic lives outside this crate (a
//! browser's declarativeNetRequest, a proxy, ...). [`MemoryRuleEngine`]
//! applies the same transaction semantics in process.

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use xff_core::{host_matches_domain, HeaderOperation, HeaderRule, Result, RotorError, RuleUpdate};

/// An engine that stores dynamic rules and applies them to traffic.
#[async_trait]
pub trait RuleEngine: Send + Sync {
    /// Atomically remove `update.remove_rule_ids`, then add `update.add_rules`.
    ///
    /// A rejected update must leave the active rules untouched.
    async fn update_dynamic_rules(&self, update: RuleUpdate) -> Result<()>;
}

#[async_trait]
impl<T: RuleEngine + ?Sized> RuleEngine for Arc<T> {
    async fn update_dynamic_rules(&self, update: RuleUpdate) -> Result<()> {
        (**self).update_dynamic_rules(update).await
    }
}

/// Number of submitted updates [`MemoryRuleEngine`] remembers
pub const TRANSACTION_LOG_LIMIT: usize = 256;

/// In-process rule engine.
///
/// Keeps the last [`TRANSACTION_LOG_LIMIT`] submitted updates for
/// inspection; older entries are dropped.
#[derive(Debug, Default)]
pub struct MemoryRuleEngine {
    state: Mutex<EngineState>,
}

#[derive(Debug, Default)]
struct EngineState {
    rules: BTreeMap<u32, HeaderRule>,
    submitted: VecDeque<RuleUpdate>,
}

impl MemoryRuleEngine {
    /// Create an engine with no rules
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Active rules ordered by id
    pub fn rules(&self) -> Vec<HeaderRule> {
        self.lock().rules.values().cloned().collect()
    }

    /// Active rule with `id`
    pub fn rule(&self, id: u32) -> Option<HeaderRule> {
        self.lock().rules.get(&id).cloned()
    }

    /// Most recent submitted updates, accepted or not, oldest first
    pub fn transactions(&self) -> Vec<RuleUpdate> {
        self.lock().submitted.iter().cloned().collect()
    }

    /// Value `header` would be set to on a request to `host`.
    ///
    /// The highest-priority matching rule wins; ties go to the lower id.
    pub fn header_for(&self, host: &str, header: &str) -> Option<String> {
        let state = self.lock();
        state
            .rules
            .values()
            .filter(|rule| {
                rule.condition
                    .anchored_domain()
                    .is_some_and(|domain| host_matches_domain(host, domain))
            })
            .filter_map(|rule| rule.header_value(header).map(|v| (rule.priority, v)))
            .min_by_key(|(priority, _)| std::cmp::Reverse(*priority))
            .map(|(_, value)| value.to_string())
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RuleEngine for MemoryRuleEngine {
    async fn update_dynamic_rules(&self, update: RuleUpdate) -> Result<()> {
        let mut state = self.lock();
        if state.submitted.len() == TRANSACTION_LOG_LIMIT {
            state.submitted.pop_front();
        }
        state.submitted.push_back(update.clone());

        validate(&update)?;

        let mut rules = state.rules.clone();
        for id in &update.remove_rule_ids {
            rules.remove(id);
        }
        for rule in update.add_rules {
            if rules.contains_key(&rule.id) {
                return Err(RotorError::RuleEngine(format!(
                    "rule id {} already exists",
                    rule.id
                )));
            }
            rules.insert(rule.id, rule);
        }

        state.rules = rules;
        Ok(())
    }
}

fn validate(update: &RuleUpdate) -> Result<()> {
    let mut seen = Vec::with_capacity(update.add_rules.len());

    for rule in &update.add_rules {
        if rule.id == 0 {
            return Err(RotorError::RuleEngine("rule id must be at least 1".into()));
        }
        if seen.contains(&rule.id) {
            return Err(RotorError::RuleEngine(format!("duplicate rule id {}", rule.id)));
        }
        seen.push(rule.id);

        if rule.condition.url_filter.is_empty() || rule.condition.resource_types.is_empty() {
            return Err(RotorError::RuleEngine(format!(
                "rule {} has an empty condition",
                rule.id
            )));
        }
        if rule.action.request_headers.is_empty() {
            return Err(RotorError::RuleEngine(format!(
                "rule {} modifies no headers",
                rule.id
            )));
        }
        for modification in &rule.action.request_headers {
            let needs_value = modification.operation != HeaderOperation::Remove;
            if needs_value && modification.value.as_deref().map_or(true, str::is_empty) {
                return Err(RotorError::RuleEngine(format!(
                    "rule {} sets {} without a value",
                    rule.id, modification.header
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn rule(id: u32, priority: u32, domain: &str, last_octet: u8) -> HeaderRule {
        HeaderRule::forwarded_for(id, priority, domain, Ipv4Addr::new(24, 0, 0, last_octet))
    }

    #[tokio::test]
    async fn test_rejected_update_leaves_rules_untouched() {
        let engine = MemoryRuleEngine::new();
        engine
            .update_dynamic_rules(RuleUpdate::replace(rule(1, 1, "example.com", 1)))
            .await
            .unwrap();

        let mut bad = rule(1, 1, "example.com", 2);
        bad.action.request_headers[0].value = Some(String::new());
        let err = engine
            .update_dynamic_rules(RuleUpdate::replace(bad))
            .await
            .unwrap_err();

        assert!(matches!(err, RotorError::RuleEngine(_)));
        assert_eq!(engine.rule(1).unwrap().header_value("X-Forwarded-For"), Some("24.0.0.1"));
        assert_eq!(engine.transactions().len(), 2);
    }

    #[tokio::test]
    async fn test_add_without_remove_conflicts() {
        let engine = MemoryRuleEngine::new();
        let add = |r| RuleUpdate {
            remove_rule_ids: vec![],
            add_rules: vec![r],
        };

        engine.update_dynamic_rules(add(rule(1, 1, "example.com", 1))).await.unwrap();
        let err = engine
            .update_dynamic_rules(add(rule(1, 1, "example.com", 2)))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("already exists"));
        assert_eq!(engine.rules().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_and_zero_ids_rejected() {
        let engine = MemoryRuleEngine::new();
        let duplicate = RuleUpdate {
            remove_rule_ids: vec![],
            add_rules: vec![rule(2, 1, "a.com", 1), rule(2, 1, "b.com", 2)],
        };
        assert!(engine.update_dynamic_rules(duplicate).await.is_err());
        assert!(engine
            .update_dynamic_rules(RuleUpdate::replace(rule(0, 1, "a.com", 1)))
            .await
            .is_err());
        assert!(engine.rules().is_empty());
    }

    #[tokio::test]
    async fn test_header_for_matches_domain_and_priority() {
        let engine = MemoryRuleEngine::new();
        engine
            .update_dynamic_rules(RuleUpdate {
                remove_rule_ids: vec![],
                add_rules: vec![
                    rule(1, 1, "example.com", 1),
                    rule(2, 5, "api.example.com", 2),
                ],
            })
            .await
            .unwrap();

        assert_eq!(engine.header_for("example.com", "X-Forwarded-For").as_deref(), Some("24.0.0.1"));
        assert_eq!(
            engine.header_for("v1.api.example.com", "x-forwarded-for").as_deref(),
            Some("24.0.0.2")
        );
        assert_eq!(engine.header_for("example.org", "X-Forwarded-For"), None);
    }

    #[tokio::test]
    async fn test_transaction_log_keeps_most_recent() {
        let engine = MemoryRuleEngine::new();
        for i in 0..TRANSACTION_LOG_LIMIT + 10 {
            let octet = u8::try_from(i % 250).unwrap() + 1;
            engine
                .update_dynamic_rules(RuleUpdate::replace(rule(1, 1, "example.com", octet)))
                .await
                .unwrap();
        }

        let log = engine.transactions();
        assert_eq!(log.len(), TRANSACTION_LOG_LIMIT);

        let newest = log.last().unwrap().add_rules[0].header_value("X-Forwarded-For");
        assert_eq!(newest, engine.rule(1).unwrap().header_value("X-Forwarded-For"));
        let oldest = log[0].add_rules[0].header_value("X-Forwarded-For");
        assert_eq!(oldest, Some("24.0.0.11"));
    }
}
