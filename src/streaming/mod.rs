//! Media streaming module.
//!
//! Range-aware serving of completed artifacts, and the relay that bridges
//! a live transcode pipe to an HTTP response body.

mod live;
mod range;

pub use live::relay;
pub use range::{content_type_for_path, parse_range_header, serve_file};
