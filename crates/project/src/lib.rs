//! # TGI Project
//!
//! Turns folders of packages and loose resource files into a project tree,
//! and renames or clones tuning inside such a tree.
//!
//! ## Flow
//!
//! ```text
//! materialize_folder(pattern, dest, config)
//!     │
//!     ├──> ConversionSession (one per run)
//!     │    ├─> CorrelationMap          instance → (tuning name, path)
//!     │    └─> DestinationMaterializer sanitized, never-overwriting paths
//!     │
//!     └──> ConversionReport            written paths, warnings, skips
//!
//! rename_or_clone(path, mode, widths, prompter)
//!     load → choose_name → rewrite → write   (+ `{base}.SimData.xml`)
//! ```
//!
//! Configuration is explicit: load a [`ProjectConfig`], call
//! [`ProjectConfig::apply_defaults`], and pass the result in.

mod config;
mod correlation;
mod error;
mod materialize;
mod pipeline;
mod rewrite;
mod session;

pub use config::{ProjectConfig, ResolvedConfig, CONFIG_ENV_VAR, CONFIG_FILE_NAME};
pub use correlation::{companion_path, CorrelationEntry, CorrelationMap};
pub use error::{ProjectError, Result};
pub use materialize::{sanitize, DestinationMaterializer, DestinationPath};
pub use pipeline::{destination_has_content, materialize_folder};
pub use rewrite::{
    override_key_comment, rename_or_clone, CompanionOutcome, CompanionRewrite, LoadedTuning,
    OverrideKind, PendingRewrite, Prompter, RewriteMode, RewriteOutcome, RewrittenTuning,
};
pub use session::{ConversionReport, ConversionSession, SourceReport};
