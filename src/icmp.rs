//! Parser for round-trip latency probe output (ping-style), one line
//! per probe attempt. Positional, whitespace-tokenized `key=value`
//! fields; the token indices are a fixed contract with the probe tool.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::date_and_time::TimeOfDay;
use crate::join::KeyVal;

const UNREACHABLE_MARKER: &str = "Zielhost nicht erreichbar";

#[derive(Debug)]
pub struct IcmpSeries {
    /// One row per probe attempt: (time-of-day, latency in ms, or
    /// None when the host was unreachable).
    pub rows: Vec<KeyVal<TimeOfDay, Option<f64>>>,
}

fn eq_value(parts: &[&str], index: usize, path: &Path, linenum: usize) -> Result<f64> {
    let token = parts.get(index).ok_or_else(|| {
        anyhow!("parsing file {path:?}:{linenum}: missing token at index {index}")
    })?;
    let value = token.split('=').nth(1).ok_or_else(|| {
        anyhow!("parsing file {path:?}:{linenum}: token {token:?} is not `key=value`")
    })?;
    value
        .parse()
        .with_context(|| anyhow!("parsing file {path:?}:{linenum}: value in {token:?}"))
}

impl IcmpSeries {
    pub fn read_file(path: &Path, anchor: TimeOfDay) -> Result<Self> {
        let input = File::open(path).with_context(|| anyhow!("opening ICMP log {path:?}"))?;
        Self::from_reader(BufReader::new(input), path, anchor)
    }

    /// A running counter of probe lines backs the unreachable-host
    /// branch: those lines have no elapsed-time field, so the elapsed
    /// time is estimated from the reported sequence value minus the
    /// accumulated drift between sequence and counter
    /// (`timeout_difference`). With several consecutive timeouts the
    /// two drift apart, so the estimate is a known approximation; it
    /// is preserved as-is from the field campaign's tooling.
    fn from_reader(input: impl BufRead, path: &Path, anchor: TimeOfDay) -> Result<Self> {
        let mut rows = Vec::new();
        let mut line_counter: u32 = 0;
        for (linenum, line) in input.lines().enumerate() {
            let linenum = linenum + 1;
            let line = line.with_context(|| anyhow!("reading ICMP log {path:?}"))?;
            if !line.contains("icmp_seq=") {
                continue;
            }
            line_counter += 1;

            let parts: Vec<&str> = line.split_whitespace().collect();
            let (elapsed, latency) = if line.contains(UNREACHABLE_MARKER) {
                let time_field = eq_value(&parts, 2, path, linenum)?;
                let timeout_difference = time_field - f64::from(line_counter);
                (time_field - timeout_difference, None)
            } else {
                let elapsed = eq_value(&parts, 4, path, linenum)?;
                let latency = eq_value(&parts, 6, path, linenum)?;
                (elapsed, Some(latency))
            };
            rows.push(KeyVal::new(anchor.add_elapsed(elapsed), latency));
        }
        Ok(IcmpSeries { rows })
    }
}
