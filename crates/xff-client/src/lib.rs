//! HTTP client for the RIPEstat registry.
//!
//! This crate provides [`RipeStatClient`], which fetches the prefixes an
//! Autonomous System currently announces, and the [`PrefixSource`] trait the
//! rotation pipeline consumes.

#![doc(html_root_url = "https://docs.rs/xff-client/0.1.0")]

mod client;
mod source;

pub use client::{RipeStatClient, RipeStatClientBuilder};
pub use source::PrefixSource;
pub use xff_core::{Result, RotorError};
