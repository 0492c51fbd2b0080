//! Parser for GPSD-style logs: newline-delimited JSON where each line
//! is one report object. Only `class == "TPV"` reports carry a fix;
//! everything else is skipped.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::DateTime;
use serde_json::Value;

use crate::date_and_time::TimeOfDay;
use crate::join::KeyVal;

/// Mean position over all fixes that fall into one second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanFix {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug)]
pub struct GpsSeries {
    pub path: Box<Path>,
    /// Ordered by time, one row per second that had at least one fix.
    pub rows: Vec<KeyVal<TimeOfDay, MeanFix>>,
}

#[derive(Debug, Default)]
struct SecondBucket {
    lat_sum: f64,
    lon_sum: f64,
    count: u32,
}

impl GpsSeries {
    pub fn read_file(path: &Path) -> Result<Self> {
        let input = File::open(path).with_context(|| anyhow!("opening GPS log {path:?}"))?;
        Self::from_reader(BufReader::new(input), path)
    }

    /// Malformed JSON aborts the run (no per-line recovery); TPV
    /// reports that lack one of lat/lon/time are skipped, as are
    /// reports of any other class.
    fn from_reader(mut input: impl BufRead, path: &Path) -> Result<Self> {
        let mut line = String::new();
        let mut linenum = 0;
        let mut buckets: BTreeMap<TimeOfDay, SecondBucket> = BTreeMap::new();

        loop {
            line.clear();
            if input
                .read_line(&mut line)
                .with_context(|| anyhow!("reading GPS log {path:?}"))?
                == 0
            {
                break;
            }
            linenum += 1;

            let report: Value = serde_json::from_str(line.trim_end())
                .with_context(|| anyhow!("parsing file {path:?}:{linenum}"))?;
            if report.get("class").and_then(Value::as_str) != Some("TPV") {
                continue;
            }
            let (Some(lat), Some(lon), Some(time)) = (
                report.get("lat").and_then(Value::as_f64),
                report.get("lon").and_then(Value::as_f64),
                report.get("time").and_then(Value::as_str),
            ) else {
                // TPV without a (complete) fix, e.g. mode 1
                continue;
            };
            let time = DateTime::parse_from_rfc3339(time)
                .with_context(|| anyhow!("parsing file {path:?}:{linenum}: TPV time {time:?}"))?;

            let bucket = buckets.entry(TimeOfDay::truncated(time.time())).or_default();
            bucket.lat_sum += lat;
            bucket.lon_sum += lon;
            bucket.count += 1;
        }

        let rows = buckets
            .into_iter()
            .map(|(time, bucket)| {
                let n = f64::from(bucket.count);
                KeyVal::new(
                    time,
                    MeanFix {
                        lat: bucket.lat_sum / n,
                        lon: bucket.lon_sum / n,
                    },
                )
            })
            .collect();
        Ok(GpsSeries {
            path: path.into(),
            rows,
        })
    }

    /// The first row's time, used as `init_time` to reconstruct
    /// absolute times in the offset-based sources.
    pub fn anchor_time(&self) -> Result<TimeOfDay> {
        match self.rows.first() {
            Some(row) => Ok(row.key),
            None => bail!("GPS log {:?} contains no TPV fixes", self.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Cursor;

    fn parse(s: &str) -> Result<GpsSeries> {
        GpsSeries::from_reader(Cursor::new(s), Path::new("test.gps"))
    }

    #[test]
    fn t_same_second_fixes_are_averaged() {
        let series = parse(concat!(
            r#"{"class":"TPV","time":"2023-06-13T12:00:00.500Z","lat":50.0,"lon":8.0}"#,
            "\n",
            r#"{"class":"TPV","time":"2023-06-13T12:00:00.900Z","lat":50.002,"lon":8.002}"#,
            "\n",
        ))
        .unwrap();
        assert_eq!(series.rows.len(), 1);
        let row = &series.rows[0];
        assert_eq!(row.key.to_string(), "12:00:00");
        assert_relative_eq!(row.val.lat, 50.001, epsilon = 1e-12);
        assert_relative_eq!(row.val.lon, 8.001, epsilon = 1e-12);
    }

    #[test]
    fn t_other_classes_and_fixless_tpv_are_skipped() {
        let series = parse(concat!(
            r#"{"class":"VERSION","release":"3.22"}"#,
            "\n",
            r#"{"class":"TPV","mode":1}"#,
            "\n",
            r#"{"class":"TPV","time":"2023-06-13T12:00:02Z","lat":50.0,"lon":8.0}"#,
            "\n",
            r#"{"class":"SKY","satellites":[]}"#,
            "\n",
        ))
        .unwrap();
        assert_eq!(series.rows.len(), 1);
        assert_eq!(series.anchor_time().unwrap().to_string(), "12:00:02");
    }

    #[test]
    fn t_rows_are_ordered_and_anchor_is_first() {
        let series = parse(concat!(
            r#"{"class":"TPV","time":"2023-06-13T12:00:05Z","lat":50.1,"lon":8.1}"#,
            "\n",
            r#"{"class":"TPV","time":"2023-06-13T12:00:03Z","lat":50.0,"lon":8.0}"#,
            "\n",
        ))
        .unwrap();
        let times: Vec<String> = series.rows.iter().map(|r| r.key.to_string()).collect();
        assert_eq!(times, vec!["12:00:03", "12:00:05"]);
        assert_eq!(series.anchor_time().unwrap().to_string(), "12:00:03");
    }

    #[test]
    fn t_malformed_json_aborts() {
        let err = parse("{\"class\":\n").unwrap_err();
        assert!(format!("{err:#}").contains("test.gps"));
    }

    #[test]
    fn t_empty_log_has_no_anchor() {
        let series = parse("").unwrap();
        assert!(series.anchor_time().is_err());
    }
}
