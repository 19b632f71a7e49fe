// crates/api/src/lib.rs
//! Typed async client for the QPeptide digest service.
//!
//! Wire types mirror the backend schemas field-for-field (snake_case JSON),
//! and [`DigestApi`] is the seam higher layers program against so they can be
//! tested without a live server.

pub mod client;
pub mod error;
pub mod types;

pub use client::{DigestApi, DigestClient};
pub use error::{parse_error_detail, ApiError};
pub use types::{
    CriteriaResponse, DigestPeptidesResponse, DigestResponse, NewDigestRequest, PeptideResponse,
};
