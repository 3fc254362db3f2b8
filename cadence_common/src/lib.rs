//! Cadence Common Library
//!
//! Shared vocabulary for the Cadence control core: the closed topic registry,
//! the payload kinds carried on each topic, operating phase / mode signals,
//! and TOML configuration loading.
//!
//! # Module Structure
//!
//! - [`topic`] - Closed topic enumeration and its payload-kind binding
//! - [`payload`] - Tagged payload variant and unit newtypes
//! - [`phase`] - Operating phase, mode signals and run modes
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Workspace-wide limits and defaults
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use cadence_common::prelude::*;
//!
//! let topic = Topic::from_id(TopicId(0)).unwrap();
//! assert_eq!(topic.kind(), PayloadKind::Int);
//! ```

pub mod config;
pub mod consts;
pub mod payload;
pub mod phase;
pub mod prelude;
pub mod topic;
