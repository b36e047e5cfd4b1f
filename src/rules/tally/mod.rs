//! Rules native to this linter.

mod no_unreachable_stages;
mod prefer_heredoc;

pub use no_unreachable_stages::NoUnreachableStages;
pub use prefer_heredoc::{PreferHeredoc, HEREDOC_FIX_PRIORITY, HEREDOC_RESOLVER_ID};
