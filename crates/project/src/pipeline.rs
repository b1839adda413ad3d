//! Folder → project conversion.
//!
//! ```text
//! source pattern ──glob──> paths (in order)
//!     │
//!     ├──> *.package ──> Packages/{name}/
//!     │      ├─> pass 1: tuning      → {TuningType}/{declared name}.xml
//!     │      │                          (records instance → name, path)
//!     │      └─> pass 2: everything else
//!     │            ├─> SimData        → beside its tuning, or {Group}/…
//!     │            ├─> string tables  → StringTable/{Locale}.stbl.json
//!     │            ├─> binaries       → {BinaryType}/{key}.{dds|png|binary}
//!     │            └─> unknown types  → Unsupported/{type}/{key}.binary
//!     │
//!     └──> T-G-I named loose file ──> Loose Files/ (same rules)
//! ```

use crate::config::ResolvedConfig;
use crate::correlation::companion_path;
use crate::error::{ProjectError, Result};
use crate::materialize::DestinationPath;
use crate::session::{ConversionReport, ConversionSession, SourceReport};
use std::path::{Path, PathBuf};
use tgi_codec::{
    extract, extract_loose, infer_key, insert_override, key_from_filename, Decoded,
    KeyOverrides, ResourceEntry, ResourceFilter, SimData, StringTableJson, TypedValue,
};
use tgi_model::{format_hex, format_key, BinaryType, ResourceCategory, ResourceKey};

const PACKAGE_EXTENSION: &str = "package";
const SIMDATA_EXTENSION: &str = "SimData.xml";
const BINARY_SIMDATA_EXTENSION: &str = "simdata";
const STRING_TABLE_FOLDER: &str = "StringTable";
const SIMDATA_FOLDER: &str = "SimData";

/// Convert every file matching `source_pattern` into a project tree under
/// `dest_root`.
///
/// Sources are processed one at a time in glob order. A source that cannot
/// be read, or an entry that cannot be written, is logged and recorded in the
/// report; the run carries on with the next one.
pub async fn materialize_folder(
    source_pattern: &str,
    dest_root: &Path,
    config: ResolvedConfig,
) -> Result<ConversionReport> {
    let sources = collect_sources(source_pattern).await?;
    log::info!(
        "Converting {} source file(s) into {}",
        sources.len(),
        dest_root.display()
    );

    tokio::fs::create_dir_all(dest_root).await?;
    let mut session = ConversionSession::new(config, dest_root);
    for source in &sources {
        session.process_source(source).await;
    }

    let report = session.finish();
    log::info!(
        "Wrote {} file(s) from {} source(s); {} skipped, {} warning(s)",
        report.written(),
        report.sources.len(),
        report.skipped(),
        report.warnings()
    );
    Ok(report)
}

/// Whether `dir` holds anything other than hidden entries. A missing
/// directory counts as empty.
pub async fn destination_has_content(dir: &Path) -> Result<bool> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_name().to_string_lossy().starts_with('.') {
            return Ok(true);
        }
    }
    Ok(false)
}

async fn collect_sources(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).map_err(|err| ProjectError::Pattern(err.to_string()))?;

    let mut sources = Vec::new();
    for path in paths {
        let path = match path {
            Ok(path) => path,
            Err(err) => {
                log::warn!("Cannot read {}: {}", err.path().display(), err.error());
                continue;
            }
        };
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => sources.push(path),
            Ok(_) => {}
            Err(err) => log::warn!("Cannot read {}: {err}", path.display()),
        }
    }
    Ok(sources)
}

fn is_package(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PACKAGE_EXTENSION))
}

fn key_file_name(key: &ResourceKey) -> String {
    format_key(key, "_")
}

fn binary_extension(binary: BinaryType) -> &'static str {
    match binary {
        BinaryType::DdsImage | BinaryType::DstImage => "dds",
        BinaryType::PngImage => "png",
        _ => "binary",
    }
}

impl ConversionSession {
    async fn process_source(&mut self, source: &Path) {
        let mut report = SourceReport::new(source);

        if let Err(err) = self.convert_source(source, &mut report).await {
            log::warn!("Skipping {}: {err}", source.display());
            report.skipped = Some(err.to_string());
        }
        self.report.sources.push(report);
    }

    async fn convert_source(&mut self, source: &Path, report: &mut SourceReport) -> Result<()> {
        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        if is_package(source) {
            let package_name = source
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            let bytes = tokio::fs::read(source).await?;
            let base = vec![self.config.packages_folder.clone(), package_name];

            // Tuning first, so SimData finds its tuning in the correlation map.
            let tuning = extract(&bytes, ResourceFilter::Tuning)?;
            let rest = extract(&bytes, ResourceFilter::NonTuning)?;
            log::debug!(
                "{}: {} tuning, {} other",
                source.display(),
                tuning.len(),
                rest.len()
            );
            for entry in tuning.iter().chain(rest.iter()) {
                self.process_entry(entry, &base, report).await;
            }
            return Ok(());
        }

        let Some(key) = key_from_filename(&file_name) else {
            log::debug!("{}: not a T-G-I file name; skipping", source.display());
            report.skipped = Some("file name is not a resource key".to_string());
            return Ok(());
        };
        let bytes = tokio::fs::read(source).await?;
        let entry = extract_loose(key, bytes);
        let base = vec![self.config.loose_files_folder.clone()];
        self.process_entry(&entry, &base, report).await;
        Ok(())
    }

    async fn process_entry(
        &mut self,
        entry: &ResourceEntry,
        base: &[String],
        report: &mut SourceReport,
    ) {
        if let Decoded::RawFallback { reason } = &entry.decoded {
            log::warn!("{} did not decode: {reason}", entry.key);
        }

        match self.write_entry(entry, base, report).await {
            Ok(path) => {
                log::debug!("{} -> {}", entry.key, path.display());
                report.written.push(path);
            }
            Err(err) => {
                log::warn!("Failed to write {}: {err}", entry.key);
                report.warnings.push(format!("{}: {err}", entry.key));
            }
        }
    }

    async fn write_entry(
        &mut self,
        entry: &ResourceEntry,
        base: &[String],
        report: &mut SourceReport,
    ) -> Result<PathBuf> {
        match (entry.category(), &entry.decoded) {
            (ResourceCategory::Tuning(type_name), Decoded::Typed(TypedValue::Tuning(doc))) => {
                let inferred = infer_key(&doc.metadata, &self.config.bit_widths);
                let overrides = KeyOverrides::differing(&entry.key, &inferred);
                let text =
                    insert_override(&doc.text, &overrides).unwrap_or_else(|| doc.text.clone());

                let name = doc
                    .metadata
                    .declared_name
                    .clone()
                    .unwrap_or_else(|| self.config.fallback_tuning_name.clone());
                let dest = self.resolve(base, &[type_name], &name, "xml").await?;
                tokio::fs::write(&dest.resolved_path, text).await?;
                self.correlation
                    .record(entry.key.instance, name, dest.resolved_path.clone());
                Ok(dest.resolved_path)
            }
            (ResourceCategory::Tuning(type_name), _) => {
                report
                    .warnings
                    .push(format!("{}: not a valid tuning file; copied as binary", entry.key));
                self.write_raw(entry, base, &[type_name], "binary").await
            }
            (
                ResourceCategory::StructuredData { group },
                Decoded::Typed(TypedValue::SimData(simdata)),
            ) => self.write_simdata(entry, simdata, group, base).await,
            (ResourceCategory::StructuredData { group }, _) => {
                report
                    .warnings
                    .push(format!("{}: not a valid SimData; copied as binary", entry.key));
                let folder = simdata_folder(entry.key.group, &group);
                let folder: Vec<&str> = folder.iter().map(String::as_str).collect();
                self.write_raw(entry, base, &folder, "binary").await
            }
            (ResourceCategory::StringTable, Decoded::Typed(TypedValue::StringTable(table)))
                if self.config.string_tables_as_json =>
            {
                let json = StringTableJson::from_binary(&entry.key, table);
                let dest = self
                    .resolve(base, &[STRING_TABLE_FOLDER], &json.locale, "stbl.json")
                    .await?;
                tokio::fs::write(&dest.resolved_path, json.stringify()?).await?;
                Ok(dest.resolved_path)
            }
            (ResourceCategory::StringTable, decoded) => {
                if matches!(decoded, Decoded::RawFallback { .. }) {
                    report
                        .warnings
                        .push(format!("{}: not a valid string table; copied as-is", entry.key));
                }
                self.write_raw(entry, base, &[STRING_TABLE_FOLDER], "stbl").await
            }
            (ResourceCategory::Image(binary) | ResourceCategory::RawBinary(binary), _) => {
                self.write_raw(entry, base, &[binary.name()], binary_extension(binary))
                    .await
            }
            (ResourceCategory::Unsupported(type_id), _) => {
                let type_folder = format_hex(u64::from(type_id), 8, false);
                let unsupported = self.config.unsupported_folder.clone();
                let folder = [unsupported.as_str(), type_folder.as_str()];
                self.write_raw(entry, base, &folder, "binary").await
            }
        }
    }

    async fn write_simdata(
        &mut self,
        entry: &ResourceEntry,
        simdata: &SimData,
        group: Option<&'static str>,
        base: &[String],
    ) -> Result<PathBuf> {
        let extension = match simdata {
            SimData::Xml(_) => SIMDATA_EXTENSION,
            SimData::Binary(_) => BINARY_SIMDATA_EXTENSION,
        };

        let paired = self.correlation.lookup(entry.key.instance).cloned();
        let (path, companion_name) = match paired {
            Some(tuning) => {
                let name = format!("{}_SimData", tuning.canonical_name);
                let sibling = companion_path(&tuning.written_path, extension);
                let path = if self.materializer.claim(&sibling).await? {
                    sibling
                } else {
                    let dir = tuning
                        .written_path
                        .parent()
                        .map_or_else(|| self.materializer.root().to_path_buf(), Path::to_path_buf);
                    self.materializer
                        .resolve_in(&dir, &name, extension)
                        .await?
                        .resolved_path
                };
                (path, Some(name))
            }
            None => {
                let folder = simdata_folder(entry.key.group, &group);
                let folder: Vec<&str> = folder.iter().map(String::as_str).collect();
                let dest = self
                    .resolve(base, &folder, &key_file_name(&entry.key), extension)
                    .await?;
                (dest.resolved_path, None)
            }
        };

        match simdata {
            SimData::Xml(doc) => {
                let doc = match companion_name {
                    Some(name) => doc.with_instance_name(&name).unwrap_or_else(|err| {
                        log::debug!("{}: SimData keeps its instance name: {err}", entry.key);
                        doc.clone()
                    }),
                    None => doc.clone(),
                };
                tokio::fs::write(&path, doc.into_string()).await?;
            }
            SimData::Binary(bytes) => tokio::fs::write(&path, bytes).await?,
        }
        Ok(path)
    }

    async fn write_raw(
        &mut self,
        entry: &ResourceEntry,
        base: &[String],
        category: &[&str],
        extension: &str,
    ) -> Result<PathBuf> {
        let dest = self
            .resolve(base, category, &key_file_name(&entry.key), extension)
            .await?;
        tokio::fs::write(&dest.resolved_path, &entry.payload).await?;
        Ok(dest.resolved_path)
    }

    async fn resolve(
        &mut self,
        base: &[String],
        category: &[&str],
        candidate: &str,
        extension: &str,
    ) -> Result<DestinationPath> {
        let mut components: Vec<&str> = base.iter().map(String::as_str).collect();
        components.extend_from_slice(category);
        self.materializer
            .resolve_path(&components, candidate, extension)
            .await
    }
}

/// `{Group}` for known SimData groups, `SimData/{group hex}` otherwise.
fn simdata_folder(group_id: u32, group: &Option<&'static str>) -> Vec<String> {
    match group {
        Some(name) => vec![(*name).to_string()],
        None => vec![
            SIMDATA_FOLDER.to_string(),
            format_hex(u64::from(group_id), 8, false),
        ],
    }
}
