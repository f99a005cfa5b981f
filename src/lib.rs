//! # augmentflow
//!
//! Compile natural-language prompts into validated image-transform pipelines
//! and run them through a staged, hook-based orchestrator.
//!
//! ## Usage
//!
//! ```bash
//! augmentflow parse "add blur and rotate 15 degrees"
//! augmentflow run --image cat.png --prompt "flip horizontally, slight noise" --seed 42
//! ```
//!
//! ## Modules
//!
//! - `parser` - Prompt-to-transform compiler driven by a static phrase table
//! - `validation` - Prompt sanitation and per-transform parameter ranges
//! - `transform` - Transform identifiers and pipeline specs
//! - `presets` - Named, curated pipelines usable instead of a prompt
//! - `seed` - Seed resolution for reproducible runs
//! - `hooks` - Hook stages, the hook trait, the registry and the built-in hooks
//! - `orchestrator` - Staged state machine driving one session
//! - `session` - Session context, records and artifacts
//! - `services` - Engine, verification and classification interfaces
//! - `output` - Sinks receiving finalized session records
//! - `service` - Caller-facing entry points
//! - `config` - Layered TOML and environment configuration
//! - `error` - Error taxonomy with stable codes
//! - `testing` - Mocks and fixtures for pipeline tests
pub mod config;
pub mod error;
pub mod hooks;
pub mod orchestrator;
pub mod output;
pub mod parser;
pub mod presets;
pub mod seed;
pub mod service;
pub mod services;
pub mod session;
pub mod transform;
pub mod validation;

pub mod testing;


pub use error::{AugmentError, Result};
pub use service::{AugmentRequest, AugmentService, SessionSummary};
