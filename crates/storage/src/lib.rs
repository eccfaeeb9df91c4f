//! Remote object-store backends for card-set model checkpoints
//!
//! Provides the `RemoteStore` trait plus the S3 implementation used in
//! production and an in-memory fake for tests.

pub mod memory;
pub mod s3;
pub mod store;

pub use memory::MemoryStore;
pub use s3::{bucket_for, S3Config, S3Store};
pub use store::RemoteStore;
