//! Response DTOs for the API.

use dispatch_runtime::WorkerSnapshot;
use serde::Serialize;

/// Worker status listing.
#[derive(Debug, Clone, Serialize)]
pub struct WorkersResponse {
    /// Worker snapshots in declaration order.
    pub workers: Vec<WorkerSnapshot>,
    /// Total count.
    pub total: usize,
    /// Number of workers holding a claim.
    pub processing: usize,
    /// Tasks waiting in the webhook queue.
    pub queued: usize,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}
