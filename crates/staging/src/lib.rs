#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Native library staging for libstage
//!
//! Given ordered source directories, cpu filters and individually stripped
//! objects, a staging run produces one deterministic tree:
//!
//! ```text
//! <scratch>/<base/path>/__native_<module>_<name>__/
//!   libs/<abi>/...        merged sources, stripped libs, renamed executables
//!   assetLibs/<abi>/...   stripped asset libs
//!   metadata.txt          "<relative path> <blake3 hex>" per file, sorted
//! ```
//!
//! All filesystem access goes through [`libstage_platform`], so runs can be
//! exercised against [`libstage_platform::MemoryFilesystem`].

pub mod disguised;
pub mod layout;
pub mod manifest;
pub mod merge;
pub mod place;
pub mod plan;
pub mod request;
pub mod stager;

pub use layout::StagingLayout;
pub use manifest::{Manifest, ManifestDiff, ManifestEntry};
pub use plan::{StagingPlan, StagingStep, StepContext, StepOutcome};
pub use request::{RequestFile, StagingRequest, StagingRequestBuilder, StrippedObjectEntry};
pub use stager::{NativeLibraryStager, StagingOutcome};
