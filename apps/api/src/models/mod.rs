pub mod segment;

pub use segment::{SegmentKey, SegmentMap};
