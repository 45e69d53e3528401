//! Catalog export client for IDMC
//!
//! Drives the hosted catalog's asynchronous export flow end to end:
//!
//! 1. `IdmcClient::login` exchanges username/password for a session
//! 2. `IdmcClient::mint_token` exchanges the session for a bearer token
//! 3. `IdmcClient::start_export` submits a query-scoped export job
//! 4. `poll_until_complete` waits for the job to reach a terminal status
//! 5. `IdmcClient::download_export` streams the finished artifact to disk
//!
//! Every step fails fast; nothing here retries a failed call. The only
//! loop is the intentional status poll, which waits for an in-progress
//! job rather than retrying a failure.

pub mod client;
pub mod download;
pub mod error;
pub mod job;

pub use client::{IdmcClient, Session};
pub use download::resolve_filename;
pub use error::ExportError;
pub use job::{poll_until_complete, ExportJob, JobProbe, JobStatus, DEFAULT_POLL_INTERVAL};
