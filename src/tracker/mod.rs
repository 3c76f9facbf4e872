//! Tracker scan pipeline: enumerate players, look up their groups, report.

mod cache;
mod lookup;
mod report;
mod scan;

pub use cache::{FactionCache, GroupLabel};
pub use lookup::parse_group_reply;
pub use report::{MAX_FIELD_LEN, MAX_FIELDS, ReportField, ScanReport, bullets};
pub use scan::{DEFAULT_TITLE_PREFIX, candidate_names};
