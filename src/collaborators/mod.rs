//! Ports to the systems around the extraction core
//!
//! Identity rotation, record persistence and URL scheduling are owned
//! elsewhere. Each is a trait here with an in-process implementation used by
//! the crawl driver and by tests.

pub mod frontier;
pub mod identity;
pub mod sink;

pub use frontier::{CrawlFrontier, FrontierRequest, MemoryFrontier};
pub use identity::{IdentityPool, InMemoryIdentityPool, RetireReason, UsageDecision};
pub use sink::{DatasetSink, JsonLinesSink, MemorySink};
