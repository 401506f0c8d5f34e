//! Error types and the TTL cache shared across the application.

pub mod error;
pub mod ttl;
