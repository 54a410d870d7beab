//! Content storage for Storyloom.
//!
//! One provider per category, each caching its file and reloading when the
//! file changes on disk. Character notes can also be edited one `## name`
//! section at a time.

pub mod file_content;
pub mod index;
pub mod sections;
pub mod store;

pub use file_content::FileContent;
pub use index::{ChapterSummary, IndexContent, IndexRecord};
pub use store::{CategoryReport, ContentStore};
