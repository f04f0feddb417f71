// Copyright (c) 2026 hydrolog contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/hydrolog/hydrolog-rs

//! CSV log file on removable storage
//!
//! One file per deployment day, named from the logger ID. The header block
//! carries output codes, units, and channel UUIDs so a card pulled from the
//! field is self-describing. Rows are flushed as they are written; an
//! unplanned power loss costs at most the row in flight.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};
use tracing::{debug, info};

use crate::sensors::{Column, Observation, BAD_READING};

/// Append-only CSV record of every logged cycle.
pub struct LogFile {
    dir: PathBuf,
    logger_id: String,
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
    rows: u64,
}

impl LogFile {
    /// Log file for the given logger under the given storage directory.
    /// Nothing is touched on disk until [`LogFile::create`].
    pub fn new(dir: &Path, logger_id: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            logger_id: logger_id.to_string(),
            path: None,
            writer: None,
            rows: 0,
        }
    }

    /// Create (or reopen for append) the log file for `date`, writing the
    /// header block when the file is new and `new_header` is set.
    pub fn create(&mut self, columns: &[Column], new_header: bool, date: NaiveDate) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating storage dir {:?}", self.dir))?;

        let name = format!("{}_{}.csv", self.logger_id, date.format("%Y%m%d"));
        let path = self.dir.join(name);
        // A file that exists but cannot be stat'd may already carry a
        // header; only a missing or empty file gets one.
        let is_new = match std::fs::metadata(&path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(_) => false,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening log file {path:?}"))?;
        let mut writer = BufWriter::new(file);

        if is_new && new_header {
            let codes: Vec<&str> = columns.iter().map(|c| c.code.as_str()).collect();
            let units: Vec<&str> = columns.iter().map(|c| c.unit.as_str()).collect();
            let uuids: Vec<String> = columns.iter().map(|c| c.uuid.to_string()).collect();
            writeln!(writer, "DateTime,{}", codes.join(","))?;
            writeln!(writer, ",{}", units.join(","))?;
            writeln!(writer, ",{}", uuids.join(","))?;
            writer.flush()?;
        }

        info!(path = %path.display(), new = is_new, "log file ready");
        self.path = Some(path);
        self.writer = Some(writer);
        Ok(())
    }

    /// Append one record: local timestamp then one value per channel,
    /// formatted at each output's declared resolution.
    pub fn append(
        &mut self,
        timestamp: DateTime<FixedOffset>,
        observations: &[Observation],
    ) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            bail!("log file was never created");
        };

        let mut row = timestamp.format("%Y-%m-%d %H:%M:%S%z").to_string();
        for obs in observations {
            row.push(',');
            row.push_str(&format_value(obs.value, obs.resolution));
        }
        writeln!(writer, "{row}")?;
        writer.flush()?;
        self.rows += 1;
        debug!(rows = self.rows, "record written");
        Ok(())
    }

    /// Whether the file has been created this boot.
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Path of the current file, once created.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Rows written this boot, header excluded.
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

fn format_value(value: f64, resolution: u8) -> String {
    if value == BAD_READING {
        // The sentinel is recorded bare so portal-side tooling recognizes it.
        "-9999".to_string()
    } else {
        format!("{:.*}", resolution as usize, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "hydrolog-storage-{tag}-{}-{}",
            std::process::id(),
            Uuid::new_v4()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn columns() -> Vec<Column> {
        vec![
            Column {
                uuid: Uuid::new_v4(),
                code: "Board_Batt".into(),
                unit: "volt".into(),
                resolution: 3,
            },
            Column {
                uuid: Uuid::new_v4(),
                code: "Atlas_Temp".into(),
                unit: "degreeCelsius".into(),
                resolution: 3,
            },
        ]
    }

    fn observation(code: &str, value: f64) -> Observation {
        Observation {
            channel: Uuid::new_v4(),
            code: code.into(),
            value,
            unit: String::new(),
            resolution: 3,
        }
    }

    fn stamp() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(6 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 14, 10, 30, 0)
            .unwrap()
    }

    #[test]
    fn header_then_rows() {
        let dir = temp_dir("header");
        let mut log = LogFile::new(&dir, "0001");
        log.create(&columns(), true, stamp().date_naive()).unwrap();
        log.append(stamp(), &[observation("Board_Batt", 3.7), observation("Atlas_Temp", 14.125)])
            .unwrap();

        let text = std::fs::read_to_string(log.path().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "DateTime,Board_Batt,Atlas_Temp");
        assert!(lines[1].starts_with(",volt,"));
        assert!(lines[3].ends_with(",3.700,14.125"));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn sentinel_written_bare() {
        let dir = temp_dir("sentinel");
        let mut log = LogFile::new(&dir, "0001");
        log.create(&columns(), true, stamp().date_naive()).unwrap();
        log.append(stamp(), &[observation("Board_Batt", BAD_READING)])
            .unwrap();

        let text = std::fs::read_to_string(log.path().unwrap()).unwrap();
        assert!(text.lines().last().unwrap().ends_with(",-9999"));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn reopen_does_not_duplicate_header() {
        let dir = temp_dir("reopen");
        let date = stamp().date_naive();
        {
            let mut log = LogFile::new(&dir, "0001");
            log.create(&columns(), true, date).unwrap();
            log.append(stamp(), &[observation("Board_Batt", 3.7)]).unwrap();
        }
        let mut log = LogFile::new(&dir, "0001");
        log.create(&columns(), true, date).unwrap();
        log.append(stamp(), &[observation("Board_Batt", 3.6)]).unwrap();

        let text = std::fs::read_to_string(log.path().unwrap()).unwrap();
        let headers = text.lines().filter(|l| l.starts_with("DateTime")).count();
        assert_eq!(headers, 1);
        assert_eq!(text.lines().count(), 5);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn preexisting_file_is_never_reheadered() {
        let dir = temp_dir("preexisting");
        let date = stamp().date_naive();
        let path = dir.join(format!("0001_{}.csv", date.format("%Y%m%d")));
        std::fs::write(&path, "DateTime,Board_Batt,Atlas_Temp\n").unwrap();

        let mut log = LogFile::new(&dir, "0001");
        log.create(&columns(), true, date).unwrap();
        log.append(stamp(), &[observation("Board_Batt", 3.7)]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let headers = text.lines().filter(|l| l.starts_with("DateTime")).count();
        assert_eq!(headers, 1);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn append_without_create_fails() {
        let dir = temp_dir("nocreate");
        let mut log = LogFile::new(&dir, "0001");
        assert!(log.append(stamp(), &[]).is_err());
        std::fs::remove_dir_all(dir).unwrap();
    }
}
