//! Discovery and grouping of raw measurement files. Files in a
//! source folder share a run token (the `HH-MM-SS` part of their
//! name); each token's files form one `MeasurementRun` with named,
//! optional members instead of an ad-hoc string-keyed map.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use kstring::KString;
use lazy_static::lazy_static;
use regex::Regex;

use crate::info;

lazy_static! {
    /// `HH-MM-SS`, the 8 characters after the first `_` of a
    /// measurement file name.
    static ref RUN_TOKEN_RE: Regex = Regex::new(r"^\d{2}-\d{2}-\d{2}$").expect("valid regex");
}

/// The time-of-day token that identifies a run, e.g. `"12-30-45"`.
/// Also the stem of the run's output file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(KString);

impl RunId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SourceKind {
    #[strum(serialize = "bandwidth")]
    Bandwidth,
    #[strum(serialize = "GPS")]
    Gps,
    #[strum(serialize = "ICMP")]
    Icmp,
    #[strum(serialize = "capture")]
    Capture,
}

/// A run member required by the requested pipeline is not there;
/// fatal for that run only.
#[derive(Debug, thiserror::Error)]
#[error("run {run_id}: missing required {kind} log")]
pub struct MissingSourceError {
    pub run_id: RunId,
    pub kind: SourceKind,
}

/// The up to four raw files belonging to one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementFiles {
    pub bandwidth: Option<PathBuf>,
    pub gps: Option<PathBuf>,
    pub icmp: Option<PathBuf>,
    pub capture: Option<PathBuf>,
}

impl MeasurementFiles {
    fn member_mut(&mut self, kind: SourceKind) -> &mut Option<PathBuf> {
        match kind {
            SourceKind::Bandwidth => &mut self.bandwidth,
            SourceKind::Gps => &mut self.gps,
            SourceKind::Icmp => &mut self.icmp,
            SourceKind::Capture => &mut self.capture,
        }
    }

    pub fn member(&self, kind: SourceKind) -> &Option<PathBuf> {
        match kind {
            SourceKind::Bandwidth => &self.bandwidth,
            SourceKind::Gps => &self.gps,
            SourceKind::Icmp => &self.icmp,
            SourceKind::Capture => &self.capture,
        }
    }

    pub fn required(&self, run_id: &RunId, kind: SourceKind) -> Result<&Path, MissingSourceError> {
        self.member(kind).as_deref().ok_or_else(|| MissingSourceError {
            run_id: run_id.clone(),
            kind,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRun {
    pub id: RunId,
    pub files: MeasurementFiles,
}

/// The run token: 8 characters after the first `_`, validated as
/// `HH-MM-SS` shaped. None for files that do not follow the
/// measurement naming scheme.
fn extract_run_token(file_name: &str) -> Option<&str> {
    let (_prefix, rest) = file_name.split_once('_')?;
    let token = rest.get(0..8)?;
    RUN_TOKEN_RE.is_match(token).then_some(token)
}

/// What source a file carries, by name substring. The `bandwith`
/// spelling is what the capture scripts actually produce; the
/// corrected spelling is accepted too.
fn classify(file_name: &str) -> Option<SourceKind> {
    if file_name.contains("bandwith") || file_name.contains("bandwidth") {
        Some(SourceKind::Bandwidth)
    } else if file_name.contains("gpsdata") {
        Some(SourceKind::Gps)
    } else if file_name.contains("icmp") {
        Some(SourceKind::Icmp)
    } else if file_name.contains("interfacedump") {
        Some(SourceKind::Capture)
    } else {
        None
    }
}

fn group_files(
    names_and_paths: impl IntoIterator<Item = (String, PathBuf)>,
) -> Vec<MeasurementRun> {
    let mut runs: BTreeMap<RunId, MeasurementFiles> = BTreeMap::new();
    for (name, path) in names_and_paths {
        let Some(token) = extract_run_token(&name) else {
            info!("skipping {name:?}: no run token in the file name");
            continue;
        };
        let Some(kind) = classify(&name) else {
            info!("skipping {name:?}: not a known measurement kind");
            continue;
        };
        let id = RunId(KString::from_ref(token));
        let member = runs.entry(id).or_default().member_mut(kind);
        if let Some(previous) = member.replace(path) {
            info!("file {name:?} shadows {previous:?} for the same run");
        }
    }
    runs.into_iter()
        .map(|(id, files)| MeasurementRun { id, files })
        .collect()
}

/// Scan `source_folder` (non-recursively, like the collection scripts
/// lay files out) and group everything by run token.
pub fn discover_runs(source_folder: &Path) -> Result<Vec<MeasurementRun>> {
    let entries = std::fs::read_dir(source_folder)
        .with_context(|| anyhow!("reading source folder {source_folder:?}"))?;
    let mut names_and_paths = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| anyhow!("reading source folder {source_folder:?}"))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names_and_paths.push((name, path)),
            Err(name) => info!("skipping non-unicode file name {name:?}"),
        }
    }
    // read_dir order is platform dependent
    names_and_paths.sort();
    Ok(group_files(names_and_paths))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> (String, PathBuf) {
        (name.to_string(), PathBuf::from(format!("/data/{name}")))
    }

    #[test]
    fn t_token_extraction() {
        assert_eq!(extract_run_token("gpsdata_12-30-45.log"), Some("12-30-45"));
        assert_eq!(extract_run_token("bandwith_09-05-00_try2.log"), Some("09-05-00"));
        assert_eq!(extract_run_token("README"), None);
        assert_eq!(extract_run_token("gpsdata_12-30"), None);
        assert_eq!(extract_run_token("gpsdata_aa-bb-cc.log"), None);
    }

    #[test]
    fn t_grouping_by_token() {
        let runs = group_files([
            entry("bandwith_12-30-45.log"),
            entry("gpsdata_12-30-45.log"),
            entry("icmp_12-30-45.log"),
            entry("interfacedump_12-30-45.pcap"),
            entry("gpsdata_13-00-00.log"),
            entry("notes.txt"),
        ]);
        assert_eq!(runs.len(), 2);

        let first = &runs[0];
        assert_eq!(first.id.as_str(), "12-30-45");
        assert_eq!(
            first.files.bandwidth.as_deref(),
            Some(Path::new("/data/bandwith_12-30-45.log"))
        );
        assert!(first.files.gps.is_some());
        assert!(first.files.icmp.is_some());
        assert!(first.files.capture.is_some());

        let second = &runs[1];
        assert_eq!(second.id.as_str(), "13-00-00");
        assert_eq!(second.files.bandwidth, None);
    }

    #[test]
    fn t_missing_member_is_a_named_run_error() {
        let runs = group_files([entry("gpsdata_13-00-00.log")]);
        let err = runs[0]
            .files
            .required(&runs[0].id, SourceKind::Bandwidth)
            .unwrap_err();
        assert_eq!(err.to_string(), "run 13-00-00: missing required bandwidth log");
    }
}
