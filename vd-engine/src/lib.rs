//! vd-engine - multi-pass garment description engine
//!
//! Sends one product photograph through up to three vision-language model
//! passes, parses each reply into a partial [`Record`], merges the partials and
//! finalizes the derived fields.
//!
//! ```text
//! ImageInput → Engine::describe_image
//!     → for pass in A, B, C: backend.analyze → parser::parse_pass → merge::merge
//!     → normalize::sanitize (optional) → summary::finalize → Description
//! ```

pub mod backends;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod merge;
pub mod normalize;
pub mod parser;
pub mod prompts;
pub mod record;
pub mod summary;
pub mod types;

pub use crate::backends::{build_backend, BackendKind, StubBackend, VisionBackend};
pub use crate::config::{BackendConfig, CliOverrides, EngineSettings};
pub use crate::engine::{Description, Engine, EngineOptions, PassReport, PassStatus};
pub use crate::error::{BackendError, DescribeError, DescribeResult};
pub use crate::parser::{ParseFailure, ParseFailureReason};
pub use crate::prompts::PromptSet;
pub use crate::record::{Record, SCHEMA_VERSION};
pub use crate::types::{ImageInput, PassId, RawResponse};
