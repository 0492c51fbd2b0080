//! Parser for interval-based throughput test output (iperf-style).
//! The format is positional and whitespace-tokenized; treat the token
//! indices as a fixed contract with the capture scripts.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::date_and_time::TimeOfDay;
use crate::join::KeyVal;

#[derive(Debug)]
pub struct BandwidthSeries {
    /// One row per measurement interval: (time-of-day, bitrate).
    pub rows: Vec<KeyVal<TimeOfDay, f64>>,
}

fn is_interval_line(line: &str) -> bool {
    line.contains("/sec") && !line.contains("sender") && !line.contains("receiver")
}

impl BandwidthSeries {
    pub fn read_file(path: &Path, anchor: TimeOfDay) -> Result<Self> {
        let input = File::open(path).with_context(|| anyhow!("opening bandwidth log {path:?}"))?;
        Self::from_reader(BufReader::new(input), path, anchor)
    }

    /// Every line containing `/sec` that is not a sender/receiver
    /// summary yields one row. The interval-start offset (token 2,
    /// first piece when split on `-`) is seconds since test start;
    /// the anchor converts it to absolute time-of-day.
    fn from_reader(input: impl BufRead, path: &Path, anchor: TimeOfDay) -> Result<Self> {
        let mut rows = Vec::new();
        for (linenum, line) in input.lines().enumerate() {
            let linenum = linenum + 1;
            let line = line.with_context(|| anyhow!("reading bandwidth log {path:?}"))?;
            if !is_interval_line(&line) {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();

            let interval = parts.get(2).ok_or_else(|| {
                anyhow!("parsing file {path:?}:{linenum}: missing interval token")
            })?;
            let offset: f64 = interval
                .split('-')
                .next()
                .expect("split yields at least one piece")
                .parse()
                .with_context(|| {
                    anyhow!("parsing file {path:?}:{linenum}: interval start in {interval:?}")
                })?;

            let bitrate: f64 = parts
                .get(6)
                .ok_or_else(|| anyhow!("parsing file {path:?}:{linenum}: missing bitrate token"))?
                .parse()
                .with_context(|| anyhow!("parsing file {path:?}:{linenum}: bitrate"))?;

            rows.push(KeyVal::new(anchor.add_elapsed(offset), bitrate));
        }
        Ok(BandwidthSeries { rows })
    }
}
