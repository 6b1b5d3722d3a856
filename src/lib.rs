//! Slidegate - Sliding Window Rate Limiting
//!
//! This crate decides whether a tenant is over its requests-per-second limit
//! by summing ten per-second counters kept in a shared key-value store. It
//! ships an in-memory store, a Redis store, and a small gRPC service exposing
//! the decision.

pub mod config;
pub mod error;
pub mod grpc;
pub mod ratelimit;
pub mod store;
