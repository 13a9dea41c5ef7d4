//! VoxRoute Core Types and Traits
//!
//! This crate provides the fundamental types and traits used throughout VoxRoute:
//! - Conversation records and aggregate statistics
//! - The pure record → statistics aggregator
//! - Upstream and cache store trait abstractions
//! - Version handler request/response types
//! - Core error types

pub mod aggregate;
pub mod cache_store;
pub mod error;
pub mod handler;
pub mod types;
pub mod upstream;

pub use aggregate::aggregate;
pub use cache_store::CacheStore;
pub use error::{Error, Result};
pub use handler::{HandlerRequest, HandlerResponse};
pub use types::{AggregateStats, ConversationRecord, DailyCount, DateRange, UNKNOWN_KEY};
pub use upstream::{ConversationPage, ConversationQuery, Upstream};
