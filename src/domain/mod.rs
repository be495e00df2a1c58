// Job and outcome entities, their wire encoding, and the contracts the shared
// queue/store must satisfy. No I/O happens here.

pub mod codec;
pub mod entity;
pub mod error;
pub mod repository;
