use async_trait::async_trait;

use crate::{job::PrintJob, Result};

/// Hexagonal port for retrieving attachment bytes.
#[async_trait]
pub trait AttachmentFetcher: Send + Sync {
    /// Download the attachment at `source`, failing once the body exceeds
    /// `max_bytes`.
    async fn fetch(&self, source: &str, max_bytes: u64) -> Result<Vec<u8>>;
}

/// Hexagonal port for the physical printer.
///
/// Implementations must write a whole job before returning; the dispatcher
/// never interleaves two jobs.
#[async_trait]
pub trait PrinterSink: Send + Sync {
    async fn print(&self, job: &PrintJob) -> Result<()>;
}
