// Batch ingestion: paged, resumable skill extraction over the HR feed.
// The controller owns the job state machine; the merger owns idempotent writes.

pub mod controller;
pub mod handlers;
pub mod merger;
