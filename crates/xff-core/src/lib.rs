//! Core types for xff-rotor.
//!
//! This crate provides the foundational pieces shared across the workspace:
//!
//! - **CIDR arithmetic**: parsing IPv4 blocks and sampling usable hosts ([`cidr`])
//! - **Types**: registry responses, the prefix filter and declarative header rules
//! - **Configuration**: [`RotorConfig`]
//! - **Errors**: the rotation error taxonomy in [`RotorError`]
//!
//! # Example
//!
//! ```rust
//! use xff_core::{cidr::CidrBlock, PrefixFilter};
//!
//! let usable = PrefixFilter::default().apply(&["24.0.0.0/12", "2601::/20"]);
//! let block = CidrBlock::parse(&usable[0]).unwrap();
//! let host = block.sample_host(&mut rand::thread_rng()).unwrap();
//! assert!(block.contains(host));
//! ```

#![doc(html_root_url = "https://docs.rs/xff-core/0.1.0")]

pub mod cidr;
mod config;
mod error;
pub mod types;

pub use cidr::CidrBlock;
pub use config::RotorConfig;
pub use error::{Result, RotorError};
pub use types::*;
