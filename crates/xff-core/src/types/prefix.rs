use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::RotorError;

/// Autonomous System number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Asn(pub u32);

impl Asn {
    /// Registry resource identifier, e.g. `AS7922`
    #[must_use]
    pub fn resource(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Asn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AS{}", self.0)
    }
}

impl From<u32> for Asn {
    fn from(n: u32) -> Self {
        Self(n)
    }
}

impl FromStr for Asn {
    type Err = RotorError;

    /// Accepts `7922`, `AS7922` or `as7922`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s
            .strip_prefix("AS")
            .or_else(|| s.strip_prefix("as"))
            .unwrap_or(s);
        digits
            .parse()
            .map(Self)
            .map_err(|_| RotorError::Config(format!("invalid ASN: {s}")))
    }
}

/// Response of the RIPEstat `announced-prefixes` data call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnouncedPrefixesResponse {
    /// Call status reported by the registry (`ok` on success)
    #[serde(default)]
    pub status: Option<String>,

    /// Payload; absent on some error responses
    #[serde(default)]
    pub data: Option<AnnouncedPrefixesData>,
}

impl AnnouncedPrefixesResponse {
    /// All announced prefixes in registry order, IPv4 and IPv6 alike
    #[must_use]
    pub fn prefixes(&self) -> Vec<String> {
        self.data
            .as_ref()
            .map(|d| d.prefixes.iter().map(|p| p.prefix.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns true if no prefix entries were reported
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.as_ref().map_or(true, |d| d.prefixes.is_empty())
    }
}

/// Payload of an announced-prefixes response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnouncedPrefixesData {
    /// Queried resource as echoed by the registry
    #[serde(default)]
    pub resource: Option<String>,

    /// Announced prefixes
    #[serde(default)]
    pub prefixes: Vec<AnnouncedPrefix>,

    /// Start of the observation window
    #[serde(default)]
    pub query_starttime: Option<NaiveDateTime>,

    /// End of the observation window
    #[serde(default)]
    pub query_endtime: Option<NaiveDateTime>,
}

/// One announced prefix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncedPrefix {
    /// CIDR text, IPv4 or IPv6
    pub prefix: String,

    /// Periods during which the prefix was seen
    #[serde(default)]
    pub timelines: Vec<Timeline>,
}

/// Visibility window of an announced prefix
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timeline {
    /// First time seen
    #[serde(default)]
    pub starttime: Option<NaiveDateTime>,

    /// Last time seen
    #[serde(default)]
    pub endtime: Option<NaiveDateTime>,
}

/// Mask-length policy for announced prefixes.
///
/// Blocks broader than `min_mask` are not plausible residential
/// allocations; blocks narrower than `max_mask` have too few hosts to look
/// random across rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixFilter {
    /// Shortest accepted mask (largest block)
    pub min_mask: u8,

    /// Longest accepted mask (smallest block)
    pub max_mask: u8,
}

impl Default for PrefixFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixFilter {
    /// The `/12` to `/24` residential window
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min_mask: 12,
            max_mask: 24,
        }
    }

    /// Set the shortest accepted mask
    #[must_use]
    pub const fn min_mask(mut self, mask: u8) -> Self {
        self.min_mask = mask;
        self
    }

    /// Set the longest accepted mask
    #[must_use]
    pub const fn max_mask(mut self, mask: u8) -> Self {
        self.max_mask = mask;
        self
    }

    /// Whether a single prefix passes the filter
    #[must_use]
    pub fn accepts(&self, cidr: &str) -> bool {
        if cidr.contains(':') {
            return false;
        }

        cidr.split_once('/')
            .and_then(|(_, bits)| bits.trim().parse::<u8>().ok())
            .is_some_and(|mask| (self.min_mask..=self.max_mask).contains(&mask))
    }

    /// Keep the usable IPv4 prefixes, preserving order
    #[must_use]
    pub fn apply<S: AsRef<str>>(&self, prefixes: &[S]) -> Vec<String> {
        prefixes
            .iter()
            .map(|cidr| cidr.as_ref())
            .filter(|cidr| self.accepts(cidr))
            .map(String::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_drops_broad_narrow_and_ipv6() {
        let raw = ["10.0.0.0/8", "10.0.0.0/25", "2001:db8::/32", "192.168.0.0/16"];
        assert_eq!(PrefixFilter::default().apply(&raw), vec!["192.168.0.0/16"]);
    }

    #[test]
    fn test_filter_bounds_are_inclusive() {
        let filter = PrefixFilter::new();
        assert!(filter.accepts("24.0.0.0/12"));
        assert!(filter.accepts("24.0.0.0/24"));
        assert!(!filter.accepts("24.0.0.0/11"));
        assert!(!filter.accepts("24.0.0.0/25"));
        assert!(!filter.accepts("24.0.0.0"));
        assert!(!filter.accepts("24.0.0.0/x"));
    }

    #[test]
    fn test_filter_custom_window() {
        let filter = PrefixFilter::new().min_mask(20).max_mask(22);
        let raw = vec!["1.0.0.0/19".to_string(), "1.0.0.0/21".to_string()];
        assert_eq!(filter.apply(&raw), vec!["1.0.0.0/21"]);
    }

    #[test]
    fn test_asn_parse_and_display() {
        assert_eq!("AS7922".parse::<Asn>().unwrap(), Asn(7922));
        assert_eq!("as3320".parse::<Asn>().unwrap(), Asn(3320));
        assert_eq!(" 701 ".parse::<Asn>().unwrap(), Asn(701));
        assert!("ASX".parse::<Asn>().is_err());
        assert_eq!(Asn(7922).resource(), "AS7922");
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{
            "status": "ok",
            "data": {
                "resource": "7922",
                "prefixes": [
                    {"prefix": "24.0.0.0/12", "timelines": [
                        {"starttime": "2024-05-01T00:00:00", "endtime": "2024-05-15T00:00:00"}
                    ]},
                    {"prefix": "2601::/20"}
                ],
                "query_starttime": "2024-05-01T00:00:00",
                "query_endtime": "2024-05-15T00:00:00"
            }
        }"#;

        let response: AnnouncedPrefixesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.status.as_deref(), Some("ok"));
        assert_eq!(response.prefixes(), vec!["24.0.0.0/12", "2601::/20"]);
        assert!(!response.is_empty());

        let data = response.data.unwrap();
        assert_eq!(data.prefixes[0].timelines.len(), 1);
        assert!(data.query_endtime.is_some());
    }

    #[test]
    fn test_response_without_data_is_empty() {
        let response: AnnouncedPrefixesResponse =
            serde_json::from_str(r#"{"status": "ok"}"#).unwrap();
        assert!(response.is_empty());
        assert!(response.prefixes().is_empty());
    }
}
