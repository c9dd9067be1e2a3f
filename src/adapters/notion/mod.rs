//! Export platform integration
//!
//! [`NotionClient`] drives the internal export protocol: enqueue a task,
//! poll it to completion, find the download link in the notification feed,
//! stream the archive, and update the matched notification.

pub mod client;
pub mod models;

pub use client::{DownloadedArtifact, NotionClient, DOWNLOAD_CHUNK_SIZE};
