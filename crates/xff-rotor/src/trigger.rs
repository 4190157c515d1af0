//! Navigation trigger.
//!
//! The navigation source calls [`Rotor::on_before_navigate`] for every
//! navigation it observes; only top-level loads of the target domain rotate.

use crate::engine::RuleEngine;
use crate::Rotor;
use serde::{Deserialize, Serialize};
use tracing::trace;
use url::Url;
use xff_client::PrefixSource;
use xff_core::host_matches_domain;

/// Frame id of the outermost frame
pub const TOP_LEVEL_FRAME: i64 = 0;

/// A navigation about to start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEvent {
    /// Destination URL
    pub url: String,

    /// Frame the navigation happens in; 0 is the top-level frame
    pub frame_id: i64,
}

impl NavigationEvent {
    /// A top-level navigation to `url`
    #[must_use]
    pub fn top_level(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            frame_id: TOP_LEVEL_FRAME,
        }
    }

    /// Whether the navigation is in the outermost frame
    #[must_use]
    pub const fn is_top_level(&self) -> bool {
        self.frame_id == TOP_LEVEL_FRAME
    }

    /// Destination host, if the URL parses and has one
    #[must_use]
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.url).ok()?.host_str().map(String::from)
    }
}

impl<S: PrefixSource, E: RuleEngine> Rotor<S, E> {
    /// Whether `event` is a top-level navigation to the target domain
    pub fn should_rotate(&self, event: &NavigationEvent) -> bool {
        event.is_top_level()
            && event
                .host()
                .is_some_and(|host| host_matches_domain(&host, &self.config.target_domain))
    }

    /// Rotate if `event` targets the domain in the top-level frame.
    ///
    /// Returns whether a rotation ran (successful or not).
    pub async fn on_before_navigate(&self, event: &NavigationEvent) -> bool {
        if !self.should_rotate(event) {
            trace!(url = %event.url, frame_id = event.frame_id, "ignoring navigation");
            return false;
        }
        self.rotate().await;
        true
    }
}
