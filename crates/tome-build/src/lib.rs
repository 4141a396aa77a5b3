//! Build pipeline for tome.
//!
//! [`StaticSiteBuilder`] drives the stages in order:
//!
//! 1. load and parse sources in parallel ([`tome_source`])
//! 2. resolve cross-references and build navigation ([`tome_site`])
//! 3. render every page in parallel on the same worker pool ([`tome_render`])
//! 4. write pages and assets atomically ([`OutputWriter`])
//!
//! Each stage finishes completely before the next starts. The output
//! directory is only touched once every page rendered, so a failed build
//! leaves the previous output as it was.

mod builder;
mod error;
mod writer;

pub use builder::{BuildReport, BuildSettings, CheckReport, NAVIGATION_FILE, StaticSiteBuilder};
pub use error::{BuildError, WriteError};
pub use writer::{Asset, OutputWriter, collect_assets};
