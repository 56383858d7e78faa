//! Storage module for resource files
//!
//! Provides a MinIO/S3-compatible client for uploads, deletes,
//! and presigned download URLs.

mod minio_client;

pub use minio_client::MinIOClient;
