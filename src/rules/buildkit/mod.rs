//! Rules mirroring BuildKit's built-in build checks.

mod maintainer_deprecated;
mod undefined_var;

pub use maintainer_deprecated::MaintainerDeprecated;
pub use undefined_var::UndefinedVar;
