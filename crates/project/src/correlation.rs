use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Where a tuning resource was written during one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationEntry {
    pub canonical_name: String,
    pub written_path: PathBuf,
}

/// Instance id → tuning name and path, filled while tuning is written and
/// read when SimData with the same instance comes along. Lives for one run.
#[derive(Debug, Default)]
pub struct CorrelationMap {
    entries: HashMap<u64, CorrelationEntry>,
}

impl CorrelationMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a written tuning file. A later tuning with the same instance
    /// replaces the earlier one.
    pub fn record(&mut self, instance: u64, name: impl Into<String>, path: impl Into<PathBuf>) {
        let entry = CorrelationEntry {
            canonical_name: name.into(),
            written_path: path.into(),
        };
        if let Some(previous) = self.entries.insert(instance, entry) {
            log::debug!(
                "Instance {instance:016X} written twice; {} no longer pairs with SimData",
                previous.written_path.display()
            );
        }
    }

    #[must_use]
    pub fn lookup(&self, instance: u64) -> Option<&CorrelationEntry> {
        self.entries.get(&instance)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `dir/base.xml` → `dir/base.SimData.xml`.
#[must_use]
pub fn companion_path(tuning_path: &Path, extension: &str) -> PathBuf {
    let stem = tuning_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    tuning_path.with_file_name(format!("{stem}.{extension}"))
}
