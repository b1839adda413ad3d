use crate::config::ResolvedConfig;
use crate::correlation::CorrelationMap;
use crate::materialize::DestinationMaterializer;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// State owned by one folder conversion. Created when the run starts and
/// dropped when it ends; nothing carries over to the next run.
#[derive(Debug)]
pub struct ConversionSession {
    pub(crate) config: ResolvedConfig,
    pub(crate) correlation: CorrelationMap,
    pub(crate) materializer: DestinationMaterializer,
    pub(crate) report: ConversionReport,
}

impl ConversionSession {
    pub fn new(config: ResolvedConfig, dest_root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            correlation: CorrelationMap::new(),
            materializer: DestinationMaterializer::new(dest_root),
            report: ConversionReport::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    #[must_use]
    pub fn dest_root(&self) -> &Path {
        self.materializer.root()
    }

    #[must_use]
    pub fn correlation(&self) -> &CorrelationMap {
        &self.correlation
    }

    /// End the run and hand back what happened.
    #[must_use]
    pub fn finish(self) -> ConversionReport {
        self.report
    }
}

/// What a folder conversion did, per source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    pub sources: Vec<SourceReport>,
}

impl ConversionReport {
    #[must_use]
    pub fn written(&self) -> usize {
        self.sources.iter().map(|s| s.written.len()).sum()
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.sources.iter().filter(|s| s.skipped.is_some()).count()
    }

    #[must_use]
    pub fn warnings(&self) -> usize {
        self.sources.iter().map(|s| s.warnings.len()).sum()
    }

    #[must_use]
    pub fn source(&self, path: &Path) -> Option<&SourceReport> {
        self.sources.iter().find(|s| s.source == path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: PathBuf,
    pub written: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Why the whole source was passed over.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl SourceReport {
    pub(crate) fn new(source: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            written: Vec::new(),
            warnings: Vec::new(),
            skipped: None,
        }
    }
}
