//! Crawl frontier
//!
//! Pagination and detail-link follow-ups are emitted as [`FrontierRequest`]s.
//! What gets visited, and when, is the frontier's decision.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::trace;
use url::Url;

use crate::classifier::PageType;
use crate::extraction::RecordContext;

/// A request to visit `url`, expected to be a `page_type` page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierRequest {
    pub url: Url,
    pub page_type: PageType,
    pub context: RecordContext,
    /// Failed attempts charged so far
    #[serde(default)]
    pub attempts: u32,
}

impl FrontierRequest {
    #[must_use]
    pub fn new(url: Url, page_type: PageType, context: RecordContext) -> Self {
        Self {
            url,
            page_type,
            context,
            attempts: 0,
        }
    }
}

/// Work queue for follow-up requests
pub trait CrawlFrontier {
    /// Queue a request; returns false when the URL was already queued
    fn enqueue(&mut self, request: FrontierRequest) -> bool;

    /// Next request to visit
    fn next_request(&mut self) -> Option<FrontierRequest>;

    /// Requests waiting
    fn pending(&self) -> usize;
}

/// FIFO frontier that visits each URL once
#[derive(Debug, Default)]
pub struct MemoryFrontier {
    queue: VecDeque<FrontierRequest>,
    seen: HashSet<String>,
}

impl MemoryFrontier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a failed request back at the head of the queue
    ///
    /// Bypasses the visited-once check.
    pub fn requeue(&mut self, request: FrontierRequest) {
        trace!(url = %request.url, attempts = request.attempts, "requeued");
        self.queue.push_front(request);
    }
}

impl CrawlFrontier for MemoryFrontier {
    fn enqueue(&mut self, request: FrontierRequest) -> bool {
        if !self.seen.insert(request.url.as_str().to_string()) {
            trace!(url = %request.url, "already queued");
            return false;
        }
        self.queue.push_back(request);
        true
    }

    fn next_request(&mut self) -> Option<FrontierRequest> {
        self.queue.pop_front()
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }
}
