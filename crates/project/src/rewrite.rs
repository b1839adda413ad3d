//! Rename or clone a tuning file under a new name.
//!
//! ```text
//! load()            file → LoadedTuning (+ companion `{base}.SimData.xml`)
//!   │
//! choose_name()     prompt, reject empty/same names, confirm overwrite,
//!   │               reject a clone onto its own file → PendingRewrite
//! rewrite()         new `n`, new `s` hashed from the name, companion renamed
//!   │                → RewrittenTuning
//! write()           clone: write new path
//!                   rename: move, then write over the moved file
//! ```
//!
//! Nothing touches the disk before `write()`. A declined prompt ends the
//! operation with [`ProjectError::UserCancelled`].

use crate::correlation::companion_path;
use crate::error::{ProjectError, Result};
use crate::materialize::sanitize;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tgi_codec::{insert_override, rename_root, KeyOverrides, SimData, TuningDocument};
use tgi_model::BitWidths;

const COMPANION_EXTENSION: &str = "SimData.xml";
const OVERWRITE_OPTIONS: &[&str] = &["Yes", "Cancel"];

/// Interactive input supplied by the caller's UI.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Free text; `None` when the prompt was dismissed.
    async fn input_text(&self, title: &str, prompt: &str, default: &str) -> Option<String>;

    /// Index of the chosen option; `None` when dismissed.
    async fn choose(&self, message: &str, options: &[&str]) -> Option<usize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RewriteMode {
    Rename,
    Clone,
}

impl fmt::Display for RewriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rename => write!(f, "rename"),
            Self::Clone => write!(f, "clone"),
        }
    }
}

/// Tuning file read from disk, with its companion SimData if one sits beside it.
#[derive(Debug, Clone)]
pub struct LoadedTuning {
    pub path: PathBuf,
    pub document: TuningDocument,
    pub companion: Option<PathBuf>,
}

impl LoadedTuning {
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProjectError::NotFound(path.to_path_buf()))
            }
            Err(err) => return Err(err.into()),
        };
        let document = TuningDocument::from_bytes(&bytes)
            .map_err(|_| ProjectError::NotTuning(path.to_path_buf()))?;

        let candidate = companion_path(path, COMPANION_EXTENSION);
        let companion = tokio::fs::try_exists(&candidate)
            .await?
            .then_some(candidate);

        Ok(Self {
            path: path.to_path_buf(),
            document,
            companion,
        })
    }

    #[must_use]
    pub fn declared_name(&self) -> &str {
        self.document.metadata.declared_name.as_deref().unwrap_or_default()
    }

    /// Ask for the new name and validate it.
    pub async fn choose_name(
        self,
        mode: RewriteMode,
        prompter: &dyn Prompter,
    ) -> Result<PendingRewrite> {
        let title = if self.companion.is_some() {
            "Enter New Name of Tuning & SimData"
        } else {
            "Enter New Name of Tuning"
        };
        let entered = prompter
            .input_text(title, "Name will be hashed for a new instance.", self.declared_name())
            .await
            .ok_or(ProjectError::UserCancelled)?;
        self.with_name(&entered, mode, prompter).await
    }

    /// Validate `name` as the new name without asking for it.
    pub async fn with_name(
        self,
        name: &str,
        mode: RewriteMode,
        prompter: &dyn Prompter,
    ) -> Result<PendingRewrite> {
        let new_name = name.trim().to_string();
        if new_name.is_empty() {
            return Err(ProjectError::UserCancelled);
        }
        if new_name == self.declared_name() {
            return Err(ProjectError::InvalidName(
                "Cannot use current filename.".to_string(),
            ));
        }

        let dir = self.path.parent().unwrap_or_else(|| Path::new(""));
        let target = dir.join(format!("{}.xml", sanitize(&new_name)));
        if target == self.path && mode == RewriteMode::Clone {
            return Err(ProjectError::InvalidName(format!(
                "{new_name} maps to the file being cloned."
            )));
        }
        if target != self.path && tokio::fs::try_exists(&target).await? {
            let choice = prompter
                .choose(
                    "Tuning file with this name already exists. Do you want to overwrite it?",
                    OVERWRITE_OPTIONS,
                )
                .await;
            if choice != Some(0) {
                log::info!("Not overwriting {}", target.display());
                return Err(ProjectError::UserCancelled);
            }
        }

        Ok(PendingRewrite {
            loaded: self,
            mode,
            new_name,
            target,
        })
    }
}

/// A validated new name and where the result will go.
#[derive(Debug, Clone)]
pub struct PendingRewrite {
    pub loaded: LoadedTuning,
    pub mode: RewriteMode,
    pub new_name: String,
    pub target: PathBuf,
}

impl PendingRewrite {
    /// Rewrite the tuning (and companion) text in memory.
    pub async fn rewrite(self, widths: &BitWidths) -> Result<RewrittenTuning> {
        let renamed = rename_root(&self.loaded.document.text, &self.new_name, widths)?;

        let companion = match &self.loaded.companion {
            Some(source) => Some(CompanionRewrite {
                source: source.clone(),
                target: companion_path(&self.target, COMPANION_EXTENSION),
                text: rename_companion(source, &self.new_name).await,
            }),
            None => None,
        };

        Ok(RewrittenTuning {
            mode: self.mode,
            source: self.loaded.path,
            target: self.target,
            previous_name: self
                .loaded
                .document
                .metadata
                .declared_name
                .unwrap_or_default(),
            new_name: self.new_name,
            text: renamed.text,
            instance: renamed.instance,
            companion,
        })
    }
}

async fn rename_companion(source: &Path, new_name: &str) -> std::result::Result<String, String> {
    let bytes = tokio::fs::read(source).await.map_err(|err| err.to_string())?;
    match SimData::from_bytes(&bytes).map_err(|err| err.to_string())? {
        SimData::Xml(doc) => doc
            .with_instance_name(&format!("{new_name}_SimData"))
            .map(tgi_codec::SimDataXml::into_string)
            .map_err(|err| err.to_string()),
        SimData::Binary(_) => Err("binary SimData cannot be renamed".to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct CompanionRewrite {
    pub source: PathBuf,
    pub target: PathBuf,
    /// Rewritten text, or why it could not be produced.
    pub text: std::result::Result<String, String>,
}

/// Tuning text ready to be written.
#[derive(Debug, Clone)]
pub struct RewrittenTuning {
    pub mode: RewriteMode,
    pub source: PathBuf,
    pub target: PathBuf,
    pub previous_name: String,
    pub new_name: String,
    pub text: String,
    pub instance: u64,
    pub companion: Option<CompanionRewrite>,
}

impl RewrittenTuning {
    /// Commit to disk. A failure on the tuning file is an error; a failure on
    /// the companion is reported in the outcome.
    pub async fn write(self) -> Result<RewriteOutcome> {
        let mode = self.mode;
        commit(mode, &self.source, &self.target, self.text.as_bytes()).await?;
        log::info!(
            "{mode}: {} -> {}",
            self.source.display(),
            self.target.display()
        );

        let companion = match self.companion {
            None => CompanionOutcome::None,
            Some(CompanionRewrite {
                source,
                target,
                text,
            }) => {
                let written = match text {
                    Ok(text) => commit(mode, &source, &target, text.as_bytes())
                        .await
                        .map_err(|err| err.to_string()),
                    Err(err) => Err(err),
                };
                match written {
                    Ok(()) => CompanionOutcome::Written { path: target },
                    Err(error) => {
                        log::warn!(
                            "Tuning written to {}, but SimData {} was not: {error}",
                            self.target.display(),
                            target.display()
                        );
                        CompanionOutcome::Failed {
                            path: target,
                            error,
                        }
                    }
                }
            }
        };

        Ok(RewriteOutcome {
            mode,
            path: self.target,
            previous_name: self.previous_name,
            new_name: self.new_name,
            instance: self.instance,
            companion,
        })
    }
}

async fn commit(mode: RewriteMode, source: &Path, target: &Path, contents: &[u8]) -> Result<()> {
    if mode == RewriteMode::Rename && source != target {
        tokio::fs::rename(source, target).await?;
    }
    tokio::fs::write(target, contents).await?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CompanionOutcome {
    None,
    Written { path: PathBuf },
    /// The tuning file was written; this SimData file was not.
    Failed { path: PathBuf, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteOutcome {
    pub mode: RewriteMode,
    pub path: PathBuf,
    pub previous_name: String,
    pub new_name: String,
    pub instance: u64,
    pub companion: CompanionOutcome,
}

/// Load, prompt, rewrite and write in one go.
pub async fn rename_or_clone(
    path: &Path,
    mode: RewriteMode,
    widths: &BitWidths,
    prompter: &dyn Prompter,
) -> Result<RewriteOutcome> {
    let loaded = LoadedTuning::load(path).await?;
    log::debug!(
        "{mode}: loaded {} (companion: {})",
        path.display(),
        loaded.companion.is_some()
    );
    let pending = loaded.choose_name(mode, prompter).await?;
    pending.rewrite(widths).await?.write().await
}

/// Which key field an override comment pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideKind {
    Type,
    Group,
    Instance,
}

/// Insert or update one field of the override comment in a tuning file.
/// Returns `false` (and leaves the file alone) when the file has no root
/// element to annotate.
pub async fn override_key_comment(path: &Path, kind: OverrideKind, value: u64) -> Result<bool> {
    let narrow = |value: u64| {
        u32::try_from(value).map_err(|_| {
            ProjectError::InvalidValue(format!("{value:#X} does not fit in 32 bits"))
        })
    };
    let overrides = match kind {
        OverrideKind::Type => KeyOverrides {
            type_id: Some(narrow(value)?),
            ..KeyOverrides::default()
        },
        OverrideKind::Group => KeyOverrides {
            group: Some(narrow(value)?),
            ..KeyOverrides::default()
        },
        OverrideKind::Instance => KeyOverrides {
            instance: Some(value),
            ..KeyOverrides::default()
        },
    };

    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProjectError::NotFound(path.to_path_buf()))
        }
        Err(err) => return Err(err.into()),
    };
    match insert_override(&text, &overrides) {
        Some(updated) => {
            tokio::fs::write(path, updated).await?;
            Ok(true)
        }
        None => {
            log::warn!("{} has no root element; nothing to annotate", path.display());
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use tempfile::tempdir;
    use tgi_codec::infer_metadata;
    use tgi_model::{derive_instance_id, fnv64, IdSpace};

    /// Replays canned answers.
    struct Scripted {
        name: Option<String>,
        choice: Option<usize>,
        asked: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(name: Option<&str>, choice: Option<usize>) -> Self {
            Self {
                name: name.map(str::to_string),
                choice,
                asked: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Prompter for Scripted {
        async fn input_text(&self, title: &str, _prompt: &str, default: &str) -> Option<String> {
            self.asked
                .lock()
                .expect("lock")
                .push(format!("{title} [{default}]"));
            self.name.clone()
        }

        async fn choose(&self, message: &str, _options: &[&str]) -> Option<usize> {
            self.asked.lock().expect("lock").push(message.to_string());
            self.choice
        }
    }

    const BUFF: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<I c=\"Buff\" i=\"buff\" m=\"buffs.buff\" n=\"buff_Old\" s=\"1\">\n</I>";

    #[tokio::test]
    async fn dismissed_prompt_cancels() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("buff_Old.xml");
        std::fs::write(&path, BUFF).expect("write");

        let result = rename_or_clone(
            &path,
            RewriteMode::Rename,
            &BitWidths::default(),
            &Scripted::new(None, None),
        )
        .await;
        assert!(matches!(result, Err(ProjectError::UserCancelled)));
        assert_eq!(std::fs::read_to_string(&path).expect("read"), BUFF);
    }

    #[tokio::test]
    async fn same_name_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("buff_Old.xml");
        std::fs::write(&path, BUFF).expect("write");

        let prompter = Scripted::new(Some("buff_Old"), None);
        let result =
            rename_or_clone(&path, RewriteMode::Clone, &BitWidths::default(), &prompter).await;
        assert!(matches!(result, Err(ProjectError::InvalidName(_))));
        assert_eq!(
            prompter.asked.lock().expect("lock").as_slice(),
            ["Enter New Name of Tuning [buff_Old]".to_string()]
        );
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let dir = tempdir().expect("tempdir");
        let result = rename_or_clone(
            &dir.path().join("nope.xml"),
            RewriteMode::Rename,
            &BitWidths::default(),
            &Scripted::new(Some("x"), None),
        )
        .await;
        assert!(matches!(result, Err(ProjectError::NotFound(_))));
    }

    #[tokio::test]
    async fn rename_moves_and_rewrites() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("buff_Old.xml");
        std::fs::write(&path, BUFF).expect("write");

        let outcome = rename_or_clone(
            &path,
            RewriteMode::Rename,
            &BitWidths::default(),
            &Scripted::new(Some("creator:buff_New"), None),
        )
        .await
        .expect("rename");

        assert_eq!(outcome.path, dir.path().join("buff_New.xml"));
        assert_eq!(outcome.instance, fnv64("creator:buff_New"));
        assert_eq!(outcome.companion, CompanionOutcome::None);
        assert!(!path.exists());

        let metadata = infer_metadata(&std::fs::read_to_string(&outcome.path).expect("read"));
        assert_eq!(metadata.declared_name.as_deref(), Some("creator:buff_New"));
        assert_eq!(metadata.declared_instance, Some(outcome.instance));
    }

    #[tokio::test]
    async fn unreadable_companion_is_a_partial_failure() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("buff_Old.xml");
        std::fs::write(&path, BUFF).expect("write");
        std::fs::write(dir.path().join("buff_Old.SimData.xml"), "not simdata").expect("write");

        let outcome = rename_or_clone(
            &path,
            RewriteMode::Clone,
            &BitWidths::default(),
            &Scripted::new(Some("buff_New"), None),
        )
        .await
        .expect("clone");

        assert!(outcome.path.exists());
        assert!(matches!(
            outcome.companion,
            CompanionOutcome::Failed { ref path, .. } if path.ends_with("buff_New.SimData.xml")
        ));
        assert!(!dir.path().join("buff_New.SimData.xml").exists());
    }

    #[tokio::test]
    async fn override_comment_is_written_in_place() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("buff_Old.xml");
        std::fs::write(&path, BUFF).expect("write");

        assert!(override_key_comment(&path, OverrideKind::Group, 0x8000_0000)
            .await
            .expect("override"));
        let metadata = infer_metadata(&std::fs::read_to_string(&path).expect("read"));
        assert_eq!(metadata.explicit_group, Some(0x8000_0000));

        assert!(matches!(
            override_key_comment(&path, OverrideKind::Type, u64::MAX).await,
            Err(ProjectError::InvalidValue(_))
        ));

        let plain = dir.path().join("plain.xml");
        std::fs::write(&plain, "no markup").expect("write");
        assert!(!override_key_comment(&plain, OverrideKind::Instance, 1)
            .await
            .expect("override"));
        assert_eq!(std::fs::read_to_string(&plain).expect("read"), "no markup");
    }

    #[tokio::test]
    async fn other_roots_hash_with_normalized_names() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("snippet.xml");
        std::fs::write(&path, "<R n=\"creator.snippets.old\" s=\"1\">\n</R>").expect("write");

        let outcome = rename_or_clone(
            &path,
            RewriteMode::Rename,
            &BitWidths::default(),
            &Scripted::new(Some("creator.snippets.new"), None),
        )
        .await
        .expect("rename");

        assert_eq!(
            outcome.instance,
            derive_instance_id("creator.snippets.new", IdSpace::Normalized)
        );
        assert_ne!(outcome.instance, fnv64("creator.snippets.new"));

        let garbage = dir.path().join("garbage.xml");
        std::fs::write(&garbage, "no markup").expect("write");
        let result = rename_or_clone(
            &garbage,
            RewriteMode::Rename,
            &BitWidths::default(),
            &Scripted::new(Some("x"), None),
        )
        .await;
        assert!(matches!(result, Err(ProjectError::NotTuning(_))));
    }

    #[tokio::test]
    async fn rename_may_keep_the_same_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("buff_Old.xml");
        std::fs::write(&path, BUFF).expect("write");

        let prompter = Scripted::new(Some("other:buff_Old"), Some(1));
        let outcome = rename_or_clone(&path, RewriteMode::Rename, &BitWidths::default(), &prompter)
            .await
            .expect("rename");

        assert_eq!(outcome.path, path);
        assert_eq!(prompter.asked.lock().expect("lock").len(), 1);
        let metadata = infer_metadata(&std::fs::read_to_string(&path).expect("read"));
        assert_eq!(metadata.declared_name.as_deref(), Some("other:buff_Old"));
    }
}
