mod prefix;
mod rule;

pub use prefix::*;
pub use rule::*;
