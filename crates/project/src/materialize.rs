//! Collision-free destination paths.
//!
//! A candidate `name` with extension `ext` is probed as `name.ext`,
//! `name_0.ext`, `name_1.ext`, ... until a path is found that neither exists
//! on disk nor was handed out earlier in the same run.

use crate::error::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const MAX_NAME_BYTES: usize = 255;
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationPath {
    pub requested_name: String,
    pub sanitized_name: String,
    pub resolved_path: PathBuf,
    /// `Some(n)` when `_n` had to be appended.
    pub collision_suffix: Option<u32>,
}

/// Hands out destination paths under one root for the length of a run.
#[derive(Debug)]
pub struct DestinationMaterializer {
    root: PathBuf,
    reserved: HashSet<PathBuf>,
}

impl DestinationMaterializer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            reserved: HashSet::new(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create `root/components...` if needed and return it.
    pub async fn ensure_dir(&self, components: &[&str]) -> Result<PathBuf> {
        let mut dir = self.root.clone();
        for component in components {
            dir.push(sanitize(component));
        }
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Resolve `candidate.extension` inside `root/category...`, creating the
    /// directories on the way.
    pub async fn resolve_path(
        &mut self,
        category: &[&str],
        candidate: &str,
        extension: &str,
    ) -> Result<DestinationPath> {
        let dir = self.ensure_dir(category).await?;
        self.resolve_in(&dir, candidate, extension).await
    }

    /// Resolve a free path for `candidate.extension` in an existing `dir`.
    pub async fn resolve_in(
        &mut self,
        dir: &Path,
        candidate: &str,
        extension: &str,
    ) -> Result<DestinationPath> {
        let sanitized = sanitize(candidate);

        let mut suffix = None;
        loop {
            let file_name = match suffix {
                None => format!("{sanitized}.{extension}"),
                Some(n) => format!("{sanitized}_{n}.{extension}"),
            };
            let path = dir.join(file_name);
            if !self.is_taken(&path).await? {
                self.reserved.insert(path.clone());
                if suffix.is_some() {
                    log::debug!("Name collision for {candidate}; using {}", path.display());
                }
                return Ok(DestinationPath {
                    requested_name: candidate.to_string(),
                    sanitized_name: sanitized,
                    resolved_path: path,
                    collision_suffix: suffix,
                });
            }
            suffix = Some(suffix.map_or(0, |n: u32| n + 1));
        }
    }

    /// Claim a path chosen outside the probing rules. Returns `false` when
    /// the path already exists or was handed out before.
    pub async fn claim(&mut self, path: &Path) -> Result<bool> {
        if self.is_taken(path).await? {
            return Ok(false);
        }
        self.reserved.insert(path.to_path_buf());
        Ok(true)
    }

    async fn is_taken(&self, path: &Path) -> Result<bool> {
        if self.reserved.contains(path) {
            return Ok(true);
        }
        Ok(tokio::fs::try_exists(path).await?)
    }
}

/// Make `name` usable as a file name on every platform.
///
/// A leading `creator:` namespace is dropped, characters that are illegal in
/// file names become `_`, and reserved device names are prefixed.
#[must_use]
pub fn sanitize(name: &str) -> String {
    let unprefixed = name.split_once(':').map_or(name, |(_, rest)| rest);

    let mut clean: String = unprefixed
        .chars()
        .map(|c| {
            if c.is_control() || ILLEGAL_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    // Windows drops trailing dots and spaces.
    let kept = clean.trim_end_matches(&['.', ' '][..]).len();
    let dropped = clean.len() - kept;
    if dropped > 0 {
        clean.truncate(kept);
        clean.extend(std::iter::repeat('_').take(dropped));
    }

    let stem = clean.split('.').next().unwrap_or_default();
    if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(stem)) {
        clean.insert(0, '_');
    }

    if clean.is_empty() {
        clean.push('_');
    }

    if clean.len() > MAX_NAME_BYTES {
        let mut end = MAX_NAME_BYTES;
        while !clean.is_char_boundary(end) {
            end -= 1;
        }
        clean.truncate(end);
    }
    clean
}
