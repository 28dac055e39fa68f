//! Screenmap - repository scan and flow-graph extraction.
//!
//! Screenmap detects which web framework a repository uses, discovers its
//! screens and routes, extracts the code flows each screen reaches
//! (ui events, function calls, api calls, db queries) and keeps per-screen
//! screenshots current across commits.
//!
//! # Architecture
//!
//! - `provider`: tree/content and screenshot capability traits plus adapters
//! - `detect`: framework detection from tree paths
//! - `screens`: route mapping, screen naming, navigation targets
//! - `analysis`: per-file facts (definitions, imports) via tree-sitter
//! - `flows`: call-site classification, import closures, call-graph linking
//! - `graph`: deterministic ids and record assembly
//! - `screenshot`: incremental capture planning and execution
//! - `store`: record persistence
//! - `engine`: the `analyze` / `capture_screenshots` / `get_analysis` API
//! - `config`, `report`, `cli`: the command-line surface
//!
//! # Adding a New Language
//!
//! See `src/analysis/languages/` for examples. Implement `LanguageAnalyzer`
//! and register it in `languages/mod.rs`.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod detect;
pub mod engine;
pub mod flows;
pub mod graph;
pub mod model;
pub mod paths;
pub mod provider;
pub mod report;
pub mod screens;
pub mod screenshot;
pub mod store;

#[cfg(feature = "tree-sitter")]
pub use analysis::register_analyzers;
pub use config::Config;
pub use engine::{Engine, EngineError};
pub use model::{
    AnalysisRecord, AnalysisResult, CaptureResponse, CodeFlow, Framework, FrameworkDetection,
    Screen, ScreenRef, ScreenshotResult,
};
pub use store::{FileStore, MemoryStore, RecordStore};
