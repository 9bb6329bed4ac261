//! Core types and shared functionality for hairsim.
//!
//! This crate provides:
//! - Content-addressed result cache with TTL expiry and single-flight coordination
//! - Image payload decoding
//! - Hairstyle preset catalog
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod payload;
pub mod presets;

pub use cache::{CacheEntry, CacheStats, Coordinator, Fingerprint, Outcome, ResultCache};
pub use config::{AppConfig, AuthSettings, VertexCredential};
pub use error::Error;
pub use payload::DecodedImage;
pub use presets::{Gender, Preset};
