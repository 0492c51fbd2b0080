//! The linear per-run pipeline, and the parallel driver over the
//! whole run collection. Stages within a run are strictly sequential
//! (the GPS anchor feeds the other parsers, the merge feeds the
//! distance stage); runs share no mutable state and are processed
//! independently.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::bandwidth::BandwidthSeries;
use crate::distance::append_distance_column;
use crate::gps::GpsSeries;
use crate::icmp::IcmpSeries;
use crate::run::config::{DistanceMode, EvaluationConfig};
use crate::{debug, info};
use crate::run::measurement_dir::{MeasurementRun, SourceKind};
use crate::table::JoinedTable;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Also parse and join the ICMP latency log.
    pub with_icmp: bool,
    pub mode: DistanceMode,
    /// Where the per-run CSV files go.
    pub output_dir: PathBuf,
}

/// Run the full pipeline for one run and return the written output
/// path. Any error leaves no (partial) output file for this run.
pub fn process_run(
    run: &MeasurementRun,
    config: &EvaluationConfig,
    options: &PipelineOptions,
) -> Result<PathBuf> {
    let context = |stage: &'static str| anyhow!("run {}: {stage}", run.id);

    let gps_path = run.files.required(&run.id, SourceKind::Gps)?;
    let gps = GpsSeries::read_file(gps_path).with_context(|| context("GPS stage"))?;
    let anchor = gps.anchor_time().with_context(|| context("GPS stage"))?;
    debug!("run {}: anchor time {anchor}", run.id);

    let bandwidth_path = run.files.required(&run.id, SourceKind::Bandwidth)?;
    let bandwidth = BandwidthSeries::read_file(bandwidth_path, anchor)
        .with_context(|| context("bandwidth stage"))?;

    let icmp = if options.with_icmp {
        let icmp_path = run.files.required(&run.id, SourceKind::Icmp)?;
        Some(IcmpSeries::read_file(icmp_path, anchor).with_context(|| context("ICMP stage"))?)
    } else {
        None
    };

    let mut table = JoinedTable::merge(gps, bandwidth, icmp);
    info!("run {}: {} joined rows", run.id, table.rows.len());

    for (name, point) in config.distance_columns(options.mode)? {
        append_distance_column(&mut table, name, &point);
    }

    let output_path = options.output_dir.join(format!("{}.csv", run.id));
    table
        .write_csv(&output_path)
        .with_context(|| context("output stage"))?;
    Ok(output_path)
}

/// Process every run, in parallel. A failing run is reported and does
/// not abort its siblings; the overall result is an error if any run
/// failed.
pub fn process_all(
    runs: &[MeasurementRun],
    config: &EvaluationConfig,
    options: &PipelineOptions,
) -> Result<()> {
    if runs.is_empty() {
        bail!("no measurement runs found");
    }

    let results: Vec<(&MeasurementRun, Result<PathBuf>)> = runs
        .par_iter()
        .map(|run| (run, process_run(run, config, options)))
        .collect();

    let mut failures = 0;
    for (run, result) in results {
        match result {
            Ok(path) => info!("run {}: wrote {path:?}", run.id),
            Err(e) => {
                eprintln!("run {}: {e:#}", run.id);
                failures += 1;
            }
        }
    }
    if failures > 0 {
        bail!("{failures} of {} runs failed", runs.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::measurement_dir::discover_runs;
    use std::fs;

    fn write_run_inputs(dir: &Path) {
        fs::write(
            dir.join("gpsdata_12-00-00.log"),
            concat!(
                r#"{"class":"VERSION","release":"3.22"}"#,
                "\n",
                r#"{"class":"TPV","time":"2023-06-13T12:00:00.500Z","lat":50.0,"lon":8.0}"#,
                "\n",
                r#"{"class":"TPV","time":"2023-06-13T12:00:00.900Z","lat":50.002,"lon":8.002}"#,
                "\n",
                r#"{"class":"TPV","time":"2023-06-13T12:00:01.200Z","lat":50.001,"lon":8.001}"#,
                "\n",
            ),
        )
        .unwrap();
        fs::write(
            dir.join("bandwith_12-00-00.log"),
            concat!(
                "[ 5] 0.0-1.0 sec 1.25 MBytes 10.5 Mbits/sec\n",
                "[ 5] 1.0-2.0 sec 1.37 MBytes 11.5 Mbits/sec\n",
                "[ 5] 0.0-2.0 sec 2.62 MBytes 11.0 Mbits/sec sender\n",
            ),
        )
        .unwrap();
        fs::write(
            dir.join("icmp_12-00-00.log"),
            "64 bytes from 10.0.0.1: icmp_seq=1 ttl=64 time=10.5 ms\n",
        )
        .unwrap();
    }

    fn config() -> EvaluationConfig {
        serde_yml::from_str("ref_point: { lat: 50.0, lon: 8.0 }").unwrap()
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "meshtrial-pipeline-{name}-{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn t_process_run_without_icmp() {
        let dir = temp_dir("no-icmp");
        write_run_inputs(&dir);
        let runs = discover_runs(&dir).unwrap();
        assert_eq!(runs.len(), 1);

        let options = PipelineOptions {
            with_icmp: false,
            mode: DistanceMode::Single,
            output_dir: dir.clone(),
        };
        let path = process_run(&runs[0], &config(), &options).unwrap();
        assert_eq!(path.file_name().unwrap(), "12-00-00.csv");

        let written = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], ",Time,Latitude,Longitude,Bitrate,DISTANCE");
        // both GPS seconds also have a bandwidth interval
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("0,12:00:00,"));
        assert!(lines[2].starts_with("1,12:00:01,50.001,8.001,11.5,"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn t_process_run_with_icmp_narrows_the_join() {
        let dir = temp_dir("icmp");
        write_run_inputs(&dir);
        let runs = discover_runs(&dir).unwrap();

        let options = PipelineOptions {
            with_icmp: true,
            mode: DistanceMode::Single,
            output_dir: dir.clone(),
        };
        let path = process_run(&runs[0], &config(), &options).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], ",Time,Latitude,Longitude,Bitrate,Latency,DISTANCE");
        // the single probe line lands on 12:00:01 only
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("0,12:00:01,50.001,8.001,11.5,10.5,"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn t_missing_required_member_fails_the_run_only() {
        let dir = temp_dir("missing");
        fs::write(
            dir.join("gpsdata_12-00-00.log"),
            concat!(
                r#"{"class":"TPV","time":"2023-06-13T12:00:00Z","lat":50.0,"lon":8.0}"#,
                "\n"
            ),
        )
        .unwrap();
        let runs = discover_runs(&dir).unwrap();

        let options = PipelineOptions {
            with_icmp: false,
            mode: DistanceMode::Single,
            output_dir: dir.clone(),
        };
        let err = process_run(&runs[0], &config(), &options).unwrap_err();
        assert!(err.to_string().contains("missing required bandwidth log"));
        assert!(process_all(&runs, &config(), &options).is_err());
        // no partial output
        assert!(!dir.join("12-00-00.csv").exists());

        fs::remove_dir_all(&dir).unwrap();
    }
}
