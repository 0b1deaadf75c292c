//! Org authorization filter.
//!
//! Scopes the employee directory to what an acting administrator may see and
//! target. A root admin sees the full directory; a manager admin sees every
//! employee whose supervisor chain reaches them. The supervisor relation is a
//! denormalized name pair, so resolution goes through a pre-built
//! normalized-name index rather than repeated directory scans.

pub mod filter;
pub mod index;

pub use filter::{MAX_SUPERVISOR_DEPTH, visible_employees};
pub use index::{DirectoryIndex, NameKey};
