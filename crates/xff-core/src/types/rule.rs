//! Declarative header-rewrite rules.
//!
//! These serialize to the JSON shape accepted by declarativeNetRequest's
//! `updateDynamicRules`.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Header rewritten by the rotation rule
pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

/// A single header-modification rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRule {
    /// Rule identity; installing a rule replaces any rule with this id
    pub id: u32,

    /// Match priority
    pub priority: u32,

    /// What to do with matching requests
    pub action: RuleAction,

    /// Which requests match
    pub condition: RuleCondition,
}

impl HeaderRule {
    /// Rule setting `X-Forwarded-For` to `address` on every request to
    /// `domain` and its subdomains
    #[must_use]
    pub fn forwarded_for(id: u32, priority: u32, domain: &str, address: Ipv4Addr) -> Self {
        Self {
            id,
            priority,
            action: RuleAction::set_header(FORWARDED_FOR_HEADER, address.to_string()),
            condition: RuleCondition::for_domain(domain),
        }
    }

    /// Value the rule sets for `header`, if any
    #[must_use]
    pub fn header_value(&self, header: &str) -> Option<&str> {
        self.action
            .request_headers
            .iter()
            .find(|m| m.header.eq_ignore_ascii_case(header) && m.operation == HeaderOperation::Set)
            .and_then(|m| m.value.as_deref())
    }
}

/// Rule action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleAction {
    /// Action kind
    #[serde(rename = "type")]
    pub kind: ActionType,

    /// Request header modifications
    #[serde(default)]
    pub request_headers: Vec<HeaderModification>,
}

impl RuleAction {
    /// Action that sets one request header to a literal value
    #[must_use]
    pub fn set_header(header: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: ActionType::ModifyHeaders,
            request_headers: vec![HeaderModification {
                header: header.into(),
                operation: HeaderOperation::Set,
                value: Some(value.into()),
            }],
        }
    }
}

/// Kind of rule action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionType {
    /// Rewrite request or response headers
    ModifyHeaders,
}

/// One header rewrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderModification {
    /// Header name
    pub header: String,

    /// Operation applied to the header
    pub operation: HeaderOperation,

    /// New value; required for `set` and `append`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Header operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderOperation {
    /// Replace the header
    Set,
    /// Append to the header
    Append,
    /// Remove the header
    Remove,
}

/// Rule match condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    /// URL pattern; `||domain^` anchors on the domain and its subdomains
    pub url_filter: String,

    /// Resource types the rule applies to
    pub resource_types: Vec<ResourceType>,
}

impl RuleCondition {
    /// Match `domain` and every subdomain across all resource types
    #[must_use]
    pub fn for_domain(domain: &str) -> Self {
        Self {
            url_filter: format!("||{}^", domain.trim_matches('.')),
            resource_types: ResourceType::ALL.to_vec(),
        }
    }

    /// Domain anchored by the URL filter, if it has the `||domain^` form
    #[must_use]
    pub fn anchored_domain(&self) -> Option<&str> {
        self.url_filter
            .strip_prefix("||")
            .and_then(|rest| rest.strip_suffix('^'))
            .filter(|domain| !domain.is_empty())
    }
}

/// Browser resource categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Top-level document
    MainFrame,
    /// Nested frame document
    SubFrame,
    /// XHR and fetch
    Xmlhttprequest,
    /// Script
    Script,
    /// Image
    Image,
    /// Font
    Font,
    /// Stylesheet
    Stylesheet,
    /// Audio and video
    Media,
    /// Anything else
    Other,
}

impl ResourceType {
    /// Every category the rotation rule covers
    pub const ALL: [Self; 9] = [
        Self::MainFrame,
        Self::SubFrame,
        Self::Xmlhttprequest,
        Self::Script,
        Self::Image,
        Self::Font,
        Self::Stylesheet,
        Self::Media,
        Self::Other,
    ];
}

/// Atomic remove-then-add transaction submitted to a rule engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleUpdate {
    /// Ids removed before the new rules are added
    #[serde(default)]
    pub remove_rule_ids: Vec<u32>,

    /// Rules added
    #[serde(default)]
    pub add_rules: Vec<HeaderRule>,
}

impl RuleUpdate {
    /// Replace whatever rule holds `rule.id` with `rule`
    #[must_use]
    pub fn replace(rule: HeaderRule) -> Self {
        Self {
            remove_rule_ids: vec![rule.id],
            add_rules: vec![rule],
        }
    }
}

/// Whether `host` is `domain` or one of its subdomains (ASCII case-insensitive)
#[must_use]
pub fn host_matches_domain(host: &str, domain: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let domain = domain.trim_matches('.').to_ascii_lowercase();

    if domain.is_empty() {
        return false;
    }

    host == domain
        || host
            .strip_suffix(domain.as_str())
            .is_some_and(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_json_shape() {
        let rule = HeaderRule::forwarded_for(1, 1, "doublecounter.gg", Ipv4Addr::new(24, 1, 2, 3));
        let value = serde_json::to_value(RuleUpdate::replace(rule)).unwrap();

        assert_eq!(
            value,
            json!({
                "removeRuleIds": [1],
                "addRules": [{
                    "id": 1,
                    "priority": 1,
                    "action": {
                        "type": "modifyHeaders",
                        "requestHeaders": [{
                            "header": "X-Forwarded-For",
                            "operation": "set",
                            "value": "24.1.2.3"
                        }]
                    },
                    "condition": {
                        "urlFilter": "||doublecounter.gg^",
                        "resourceTypes": [
                            "main_frame", "sub_frame", "xmlhttprequest", "script",
                            "image", "font", "stylesheet", "media", "other"
                        ]
                    }
                }]
            })
        );
    }

    #[test]
    fn test_header_value() {
        let rule = HeaderRule::forwarded_for(1, 1, "example.com", Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(rule.header_value("x-forwarded-for"), Some("10.0.0.1"));
        assert_eq!(rule.header_value("X-Real-IP"), None);
    }

    #[test]
    fn test_anchored_domain() {
        assert_eq!(
            RuleCondition::for_domain(".example.com").anchored_domain(),
            Some("example.com")
        );
        let condition = RuleCondition {
            url_filter: "*://*.example.com/*".into(),
            resource_types: vec![],
        };
        assert_eq!(condition.anchored_domain(), None);
    }

    #[test]
    fn test_host_matches_domain() {
        assert!(host_matches_domain("doublecounter.gg", "doublecounter.gg"));
        assert!(host_matches_domain("www.DoubleCounter.gg", "doublecounter.gg"));
        assert!(host_matches_domain("a.b.doublecounter.gg.", "doublecounter.gg"));
        assert!(!host_matches_domain("notdoublecounter.gg", "doublecounter.gg"));
        assert!(!host_matches_domain("doublecounter.gg.evil.com", "doublecounter.gg"));
        assert!(!host_matches_domain("example.com", ""));
    }
}
