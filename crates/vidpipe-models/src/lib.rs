//! Shared data models for the vidpipe encode pipeline.
//!
//! Wire types mirror the remote media service's OData resource model
//! (PascalCase fields, opaque string identifiers). Domain enums
//! (`JobState`, `VideoStatus`, asset roles) are closed enumerations owned
//! by this crate so every other crate agrees on state vocabulary.

pub mod asset;
pub mod job;
pub mod locator;
pub mod video;

pub use asset::{Asset, AssetFile, AssetRole, MediaProcessor};
pub use job::{Job, JobOutcome, JobState, JobStateClass};
pub use locator::{AccessPolicy, AccessPolicyPermissions, Locator, LocatorType};
pub use video::{VideoId, VideoStatus};
