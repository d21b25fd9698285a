//! Line-oriented configuration text format.
//!
//! # Data Flow
//! ```text
//! Editing:
//!     submitted text
//!     → parse.rs (lines → ConfigItem + ParseWarning)
//!     → service layer (persist / merge)
//!
//! Display & publish:
//!     stored items
//!     → render.rs (ConfigItem → `# comment` + `key=value`)
//!     → render_document (one `[file]` section per associated file)
//! ```
//!
//! # Format
//! ```text
//! # comment bound to the next item
//! key=value
//! ```
//! There is no escaping: a value may not contain `=` and a comment is
//! whatever follows the leading `#`.

pub mod parse;
pub mod render;

pub use parse::{collapse_duplicates, parse, ParseIssue, ParseWarning, Parsed};
pub use render::{render_document, serialize, Section};
