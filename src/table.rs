//! The joined per-run table: one row per timestamp present in every
//! source, plus appended distance columns, written as one CSV file
//! per run.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use kstring::KString;

use crate::bandwidth::BandwidthSeries;
use crate::date_and_time::TimeOfDay;
use crate::gps::GpsSeries;
use crate::icmp::IcmpSeries;
use crate::io_utils::temporary_file::TemporaryFile;
use crate::join::{keyval_inner_join_2, sort_by_key, KeyVal};
use crate::utillib::path_util::add_extension;

#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub time: TimeOfDay,
    pub lat: f64,
    pub lon: f64,
    pub bitrate: f64,
    /// Meaningful only when the table was merged with an ICMP
    /// series; None there means the probe saw no reply.
    pub latency: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistanceColumn {
    pub name: KString,
    /// One value per row, same order as `JoinedTable::rows`.
    pub values: Vec<f64>,
}

#[derive(Debug)]
pub struct JoinedTable {
    /// Whether a Latency column is part of this table.
    pub with_latency: bool,
    pub rows: Vec<JoinedRow>,
    pub distances: Vec<DistanceColumn>,
}

impl JoinedTable {
    /// Strict inner join on exact time-of-day equality: GPS with
    /// bandwidth, then the result with ICMP if supplied. Timestamps
    /// missing from any joined series are dropped silently.
    pub fn merge(gps: GpsSeries, bandwidth: BandwidthSeries, icmp: Option<IcmpSeries>) -> Self {
        // GPS rows come ordered from the second-bucketing; the
        // reconstructed series have to be sorted in case the run
        // wrapped past midnight.
        let gps_rows = gps.rows;
        let mut bandwidth_rows = bandwidth.rows;
        sort_by_key(&mut bandwidth_rows);

        let position_and_bitrate = keyval_inner_join_2(gps_rows, bandwidth_rows);

        match icmp {
            None => {
                let rows = position_and_bitrate
                    .map(|KeyVal { key, val: (fix, bitrate) }| JoinedRow {
                        time: key,
                        lat: fix.lat,
                        lon: fix.lon,
                        bitrate,
                        latency: None,
                    })
                    .collect();
                JoinedTable {
                    with_latency: false,
                    rows,
                    distances: Vec::new(),
                }
            }
            Some(icmp) => {
                let mut icmp_rows = icmp.rows;
                sort_by_key(&mut icmp_rows);
                let rows = keyval_inner_join_2(position_and_bitrate, icmp_rows)
                    .map(|KeyVal { key, val: ((fix, bitrate), latency) }| JoinedRow {
                        time: key,
                        lat: fix.lat,
                        lon: fix.lon,
                        bitrate,
                        latency,
                    })
                    .collect();
                JoinedTable {
                    with_latency: true,
                    rows,
                    distances: Vec::new(),
                }
            }
        }
    }

    /// Column titles, excluding the leading row-index column (which
    /// gets an empty title in the CSV header).
    pub fn column_titles(&self) -> Vec<&str> {
        let mut titles = vec!["Time", "Latitude", "Longitude", "Bitrate"];
        if self.with_latency {
            titles.push("Latency");
        }
        for column in &self.distances {
            titles.push(column.name.as_str());
        }
        titles
    }

    /// Write the table to `path` as CSV with a leading row-index
    /// column. The data goes to a temporary file first and is renamed
    /// into place, so a failing run never leaves a partial output
    /// file behind.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        for column in &self.distances {
            if column.values.len() != self.rows.len() {
                bail!(
                    "distance column {:?} has {} values for {} rows",
                    column.name,
                    column.values.len(),
                    self.rows.len()
                );
            }
        }

        let tmp_path = add_extension(path, "tmp")
            .ok_or_else(|| anyhow!("output path {path:?} is missing a file name"))?;
        let tmp = TemporaryFile::from(tmp_path.clone());

        {
            let file = File::create(&tmp_path)
                .with_context(|| anyhow!("creating output file {tmp_path:?}"))?;
            let mut writer = csv::Writer::from_writer(BufWriter::new(file));

            let mut header = vec![String::new()];
            header.extend(self.column_titles().iter().map(|t| t.to_string()));
            writer
                .write_record(&header)
                .with_context(|| anyhow!("writing output file {tmp_path:?}"))?;

            for (index, row) in self.rows.iter().enumerate() {
                let mut record = vec![
                    index.to_string(),
                    row.time.to_string(),
                    row.lat.to_string(),
                    row.lon.to_string(),
                    row.bitrate.to_string(),
                ];
                if self.with_latency {
                    // no reply: empty field
                    record.push(row.latency.map(|l| l.to_string()).unwrap_or_default());
                }
                for column in &self.distances {
                    record.push(column.values[index].to_string());
                }
                writer
                    .write_record(&record)
                    .with_context(|| anyhow!("writing output file {tmp_path:?}"))?;
            }
            writer
                .flush()
                .with_context(|| anyhow!("writing output file {tmp_path:?}"))?;
        }

        tmp.persist(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::MeanFix;

    fn t(second: u8) -> TimeOfDay {
        TimeOfDay::from_hms(12, 0, second).unwrap()
    }

    fn gps(seconds: &[u8]) -> GpsSeries {
        GpsSeries {
            path: Path::new("test.gps").into(),
            rows: seconds
                .iter()
                .map(|&s| {
                    KeyVal::new(
                        t(s),
                        MeanFix {
                            lat: 50.0 + f64::from(s) / 1000.0,
                            lon: 8.0,
                        },
                    )
                })
                .collect(),
        }
    }

    fn bandwidth(seconds: &[u8]) -> BandwidthSeries {
        BandwidthSeries {
            rows: seconds
                .iter()
                .map(|&s| KeyVal::new(t(s), f64::from(s) * 1.5))
                .collect(),
        }
    }

    #[test]
    fn t_merge_is_strict_inner_join() {
        let table = JoinedTable::merge(gps(&[10, 11, 12]), bandwidth(&[11, 12, 13]), None);
        let times: Vec<String> = table.rows.iter().map(|r| r.time.to_string()).collect();
        assert_eq!(times, vec!["12:00:11", "12:00:12"]);
        assert!(!table.with_latency);
        assert_eq!(table.rows[0].bitrate, 16.5);
        assert_eq!(table.rows[0].lat, 50.011);
    }

    #[test]
    fn t_merge_with_icmp_drops_rows_missing_there() {
        let icmp = IcmpSeries {
            rows: vec![KeyVal::new(t(12), Some(9.5)), KeyVal::new(t(14), None)],
        };
        let table = JoinedTable::merge(gps(&[10, 11, 12]), bandwidth(&[11, 12, 13]), Some(icmp));
        assert!(table.with_latency);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].time, t(12));
        assert_eq!(table.rows[0].latency, Some(9.5));
    }

    #[test]
    fn t_column_titles() {
        let mut table = JoinedTable::merge(gps(&[10]), bandwidth(&[10]), None);
        table.distances.push(DistanceColumn {
            name: "DISTANCE".into(),
            values: vec![0.0],
        });
        assert_eq!(
            table.column_titles(),
            vec!["Time", "Latitude", "Longitude", "Bitrate", "DISTANCE"]
        );
    }

    #[test]
    fn t_write_csv() {
        let icmp = IcmpSeries {
            rows: vec![KeyVal::new(t(10), Some(9.5)), KeyVal::new(t(11), None)],
        };
        let mut table = JoinedTable::merge(gps(&[10, 11]), bandwidth(&[10, 11]), Some(icmp));
        table.distances.push(DistanceColumn {
            name: "DISTANCE".into(),
            values: vec![1.5, 2.5],
        });

        let dir = std::env::temp_dir().join(format!("meshtrial-table-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("12-00-10.csv");
        table.write_csv(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], ",Time,Latitude,Longitude,Bitrate,Latency,DISTANCE");
        assert_eq!(lines[1], "0,12:00:10,50.01,8,15,9.5,1.5");
        assert_eq!(lines[2], "1,12:00:11,50.011,8,16.5,,2.5");
        assert_eq!(lines.len(), 3);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
