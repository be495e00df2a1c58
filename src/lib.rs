//! Asynchronous background-removal pipeline.
//!
//! Submitters push an image envelope onto a shared FIFO queue and get a job id
//! back immediately. Workers pop envelopes one at a time, run the external
//! tool over per-job scratch files, and store the outcome under
//! `<prefix><job id>` with a retention TTL. Pollers read that key; a missing
//! key means the job is still pending.
//!
//! Delivery is at most once: a job popped by a worker that then dies is gone
//! and its submitter sees `pending` until giving up.

pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;
