pub mod memory;
pub mod redis_store;
pub mod tool;
pub mod workspace;
