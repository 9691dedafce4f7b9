//! DuoDok docking - receptor/antibody docking pipeline orchestration.
//!
//! Every selected receptor is paired with every selected antibody and each
//! pair goes through four external tools in a fixed order:
//! 1. Docking (HDOCK)
//! 2. Top-pose extraction (createpl)
//! 3. Binding-affinity estimation (PRODIGY)
//! 4. Interaction profiling (PLIP)
//!
//! A pair that fails stops on its own; the run carries on, then writes a
//! CSV summary and zips the whole result folder.

pub mod config;
pub mod structures;
pub mod pairs;
pub mod stage;
pub mod runner;
pub mod docking;
pub mod affinity;
pub mod report;
pub mod profiling;
pub mod summary;
pub mod pipeline;
pub mod delivery;

pub use config::{StoreLayout, ToolSpec, ToolchainConfig};
pub use delivery::{Delivery, OutboxDelivery};
pub use pairs::{enumerate_pairs, Pair};
pub use pipeline::{sanitize_label, DockingPipeline, RunAggregator, RunProgress};
pub use runner::{ProcessRunner, RunStep, ToolExecutor, ToolInvocation, ToolOutput, Toolchain};
pub use stage::{PairState, Stage};
pub use structures::StructureStore;
pub use summary::{PairFailure, PairResult, PairStatus, RunSummary};
