//! Typed client for the remote media-processing service.
//!
//! The service exposes an OData-style resource model (Assets, Files,
//! AccessPolicies, Locators, MediaProcessors, Jobs) keyed by opaque string
//! identifiers. This crate wraps it in typed operations: every call issues
//! one network request and returns a parsed result or a [`MediaError`].
//!
//! Create operations are not idempotent on the remote side, so the client
//! never retries them; callers that need de-duplication look assets up by
//! composed name first.

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod token;

pub use client::{MediaServiceClient, DEFAULT_ENCODE_PRESET, DEFAULT_MEDIA_PROCESSOR};
pub use clock::{Clock, SystemClock};
pub use config::MediaConfig;
pub use error::{MediaError, MediaResult};
pub use token::{AccessToken, ClientCredentialsProvider, StaticTokenProvider, TokenCache, TokenProvider};
