use thiserror::Error;

/// Result type alias for rotation operations
pub type Result<T> = std::result::Result<T, RotorError>;

/// Errors that can occur while rotating the forwarded address
#[derive(Error, Debug)]
pub enum RotorError {
    /// The prefix registry could not be reached, answered with a
    /// non-success status, or returned a body that could not be decoded
    #[error("prefix source unavailable: {0}")]
    SourceUnavailable(String),

    /// The registry answered but listed no prefixes at all
    #[error("prefix source returned no prefixes")]
    EmptyResult,

    /// Prefixes were returned but none survived the usable-range filter
    #[error("no usable IPv4 ranges after filtering")]
    NoUsableRanges,

    /// CIDR text is not a dotted quad followed by a mask in 0..=32
    #[error("invalid CIDR: {0}")]
    InvalidCidr(String),

    /// Block has no usable host addresses (/31 or /32)
    #[error("degenerate block without usable hosts: {0}")]
    DegenerateBlock(String),

    /// The rule engine rejected the update transaction
    #[error("rule engine rejected update: {0}")]
    RuleEngine(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl RotorError {
    /// Returns true if the error originated from fetching prefixes
    #[must_use]
    pub const fn is_source_error(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable(_) | Self::EmptyResult | Self::NoUsableRanges
        )
    }

    /// Returns true if the error is due to an unusable address block
    #[must_use]
    pub const fn is_data_error(&self) -> bool {
        matches!(self, Self::InvalidCidr(_) | Self::DegenerateBlock(_))
    }

    /// Short machine-readable name for log fields
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable(_) => "source_unavailable",
            Self::EmptyResult => "empty_result",
            Self::NoUsableRanges => "no_usable_ranges",
            Self::InvalidCidr(_) => "invalid_cidr",
            Self::DegenerateBlock(_) => "degenerate_block",
            Self::RuleEngine(_) => "rule_engine",
            Self::Config(_) => "config",
        }
    }
}
