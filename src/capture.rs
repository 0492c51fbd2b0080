//! Packet-capture decoding, delegated to an external `tshark`
//! subprocess. This is an outer collaborator: its flattened table is
//! not joined into the per-run output table, it only gets its
//! relative frame times shifted onto the absolute time axis.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use lazy_static::lazy_static;
use regex::Regex;

use crate::date_and_time::TimeOfDay;
use crate::info;
use crate::io_utils::temporary_file::TemporaryFile;
use crate::utillib::path_util::add_extension;

lazy_static! {
    static ref CAPTURE_START_RE: Regex =
        Regex::new(r"(\d{2})-(\d{2})-(\d{2})\.pcap$").expect("valid regex");
}

const TSHARK_FIELDS: &[&str] = &[
    "frame.number",
    "_ws.col.Time",
    "_ws.col.Source",
    "_ws.col.Destination",
    "_ws.col.Protocol",
    "_ws.col.Length",
    "_ws.col.Info",
];

/// The capture start time is encoded in the file name, the same
/// `HH-MM-SS` token the other sources use.
pub fn capture_start_time(pcap_path: &Path) -> Result<TimeOfDay> {
    let name = pcap_path
        .to_str()
        .ok_or_else(|| anyhow!("capture path is not unicode: {pcap_path:?}"))?;
    let captures = CAPTURE_START_RE
        .captures(name)
        .ok_or_else(|| anyhow!("no HH-MM-SS time token in capture file name {pcap_path:?}"))?;
    let token = format!("{}-{}-{}", &captures[1], &captures[2], &captures[3]);
    TimeOfDay::from_file_token(&token)
        .map_err(|e| anyhow!("time token in capture file name {pcap_path:?}: {e}"))
}

fn run_tshark(pcap_path: &Path, output: File) -> Result<()> {
    let mut cmd = Command::new("tshark");
    cmd.args(["-N", "n", "-r"])
        .arg(pcap_path)
        .args(["-T", "fields"]);
    for field in TSHARK_FIELDS {
        cmd.args(["-e", field]);
    }
    cmd.args(["-E", "header=y", "-E", "separator=;"]);
    cmd.stdout(output);

    let status = cmd
        .status()
        .with_context(|| anyhow!("running tshark on {pcap_path:?}"))?;
    if !status.success() {
        bail!("tshark on {pcap_path:?} exited with {status}");
    }
    Ok(())
}

/// Decode `pcap_path` into `<pcap_path>.csv`: a `;`-delimited table
/// with the relative `_ws.col.Time` seconds replaced by absolute
/// time-of-day, shifted by the capture's start time.
pub fn decode_capture(pcap_path: &Path) -> Result<PathBuf> {
    let start_time = capture_start_time(pcap_path)?;

    let output_path = add_extension(pcap_path, "csv")
        .ok_or_else(|| anyhow!("capture path {pcap_path:?} is missing a file name"))?;
    let raw_path = add_extension(&output_path, "tmp")
        .ok_or_else(|| anyhow!("capture path {pcap_path:?} is missing a file name"))?;
    let raw = TemporaryFile::from(raw_path.clone());

    let raw_file = File::create(raw.path())
        .with_context(|| anyhow!("creating capture table {raw_path:?}"))?;
    run_tshark(pcap_path, raw_file)?;
    rewrite_times(raw.path(), &output_path, start_time)?;
    info!("decoded capture {pcap_path:?} to {output_path:?}");
    Ok(output_path)
}

/// Rewrite the raw tshark table with absolute times (column 1).
fn rewrite_times(raw_path: &Path, output_path: &Path, start_time: TimeOfDay) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_path(raw_path)
        .with_context(|| anyhow!("reading capture table {raw_path:?}"))?;

    let tmp_path = add_extension(output_path, "tmp2")
        .ok_or_else(|| anyhow!("capture path {output_path:?} is missing a file name"))?;
    let tmp = TemporaryFile::from(tmp_path.clone());
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .from_path(&tmp_path)
            .with_context(|| anyhow!("creating capture table {tmp_path:?}"))?;

        let headers = reader
            .headers()
            .with_context(|| anyhow!("reading capture table {raw_path:?}"))?
            .clone();
        writer
            .write_record(&headers)
            .with_context(|| anyhow!("writing capture table {tmp_path:?}"))?;

        for (recnum, record) in reader.records().enumerate() {
            let record =
                record.with_context(|| anyhow!("reading capture table {raw_path:?}"))?;
            let offset: f64 = record
                .get(1)
                .ok_or_else(|| {
                    anyhow!("capture table {raw_path:?} record {recnum}: missing time column")
                })?
                .parse()
                .with_context(|| {
                    anyhow!("capture table {raw_path:?} record {recnum}: frame time")
                })?;
            let absolute = start_time.add_elapsed(offset);

            let fields: Vec<String> = record
                .iter()
                .enumerate()
                .map(|(i, field)| {
                    if i == 1 {
                        absolute.to_string()
                    } else {
                        field.to_string()
                    }
                })
                .collect();
            writer
                .write_record(&fields)
                .with_context(|| anyhow!("writing capture table {tmp_path:?}"))?;
        }
        writer
            .flush()
            .with_context(|| anyhow!("writing capture table {tmp_path:?}"))?;
    }
    tmp.persist(output_path)
}
