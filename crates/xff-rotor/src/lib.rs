//! Rotates an `X-Forwarded-For` header rule through addresses an ISP announces.
//!
//! On every top-level navigation to the target domain, [`Rotor`] fetches the
//! IPv4 prefixes an Autonomous System currently announces, picks one at
//! random, samples a usable host from it and installs a header rule that
//! claims that host as the client address.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use xff_rotor::{MemoryRuleEngine, NavigationEvent, RipeStatClient, Rotor, RotorConfig};
//!
//! #[tokio::main]
//! async fn main() -> xff_rotor::Result<()> {
//!     let engine = Arc::new(MemoryRuleEngine::new());
//!     let rotor = Rotor::new(RotorConfig::default(), RipeStatClient::new()?, engine.clone())?;
//!
//!     rotor
//!         .on_before_navigate(&NavigationEvent::top_level("https://doublecounter.gg/"))
//!         .await;
//!
//!     println!("{:?}", engine.header_for("doublecounter.gg", "X-Forwarded-For"));
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `default` - Uses rustls for TLS
//! - `rustls` - Use rustls for TLS (recommended)
//! - `native-tls` - Use system native TLS

#![doc(html_root_url = "https://docs.rs/xff-rotor/0.1.0")]

mod engine;
mod installer;
mod rotor;
mod trigger;

pub use engine::{MemoryRuleEngine, RuleEngine, TRANSACTION_LOG_LIMIT};
pub use installer::RuleInstaller;
pub use rotor::Rotor;
pub use trigger::{NavigationEvent, TOP_LEVEL_FRAME};

// Re-export core types
pub use xff_core::*;

// Re-export client
pub use xff_client::{PrefixSource, RipeStatClient, RipeStatClientBuilder};

// Re-export runtime for convenience
pub use tokio;
