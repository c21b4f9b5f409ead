//! Request and Response models for the cache server API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{validate_segment, LoadQuery, SaveRequest, TouchRequest, MAX_SEGMENT_LENGTH};
pub use responses::{
    ErrorResponse, HealthResponse, LoadResponse, MessageResponse, StatsResponse, TestResponse,
};
