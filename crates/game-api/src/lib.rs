//! Matchsync Game API Crate
//!
//! Typed, rate-limited access to the upstream game-statistics API.
//!
//! # Overview
//!
//! ```text
//! caller --> GameApiGateway --> RateLimiter::acquire --> HTTP round-trip
//!                                   (short + long window)
//! ```
//!
//! Every outbound request takes one permit from both windows of the shared
//! [`RateLimiter`] before it is sent. Responses are parsed into the typed
//! records in [`models`]; any payload that does not match the expected shape
//! surfaces as [`GameApiError::UnexpectedShape`].

pub mod client;
pub mod errors;
pub mod models;
pub mod rate_limiter;

pub use client::{GameApiGateway, RiotApiClient, RiotApiConfig};
pub use errors::{GameApiError, RetryClass};
pub use models::{MatchDetail, ParticipantDetail, RiotAccount};
pub use rate_limiter::{RateLimitConfig, RateLimitSnapshot, RateLimiter, WindowConfig};
