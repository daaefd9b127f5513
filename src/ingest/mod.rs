//! Offline store build from local markdown trees.
//!
//! Framework pages come from one directory, Griptape Nodes pages from
//! another; `nodes/<category>/<name>.md` files also yield node entries.
pub mod build;
pub mod markdown;

pub use build::{BuildOptions, BuildStats, build_store};
