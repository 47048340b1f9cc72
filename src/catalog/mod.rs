//! Product records scraped into `<content_dir>/<category>/*.jsonl`.

mod loader;
mod record;

pub use loader::{load_records, LoadReport, LoadStats};
pub use record::{ProductMetadata, ProductRecord};
