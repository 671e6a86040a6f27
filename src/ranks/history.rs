//! Append-only CSV log of every EHB value the checker has recorded.
//!
//! Each row is `timestamp,display name,ehb`, with the timestamp in local
//! time formatted as [TIMESTAMP_FORMAT]. Rows that fail to parse are skipped
//! when reading, so a hand-edited or truncated log never blocks a lookup.

// {{{ Imports
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDateTime;
use tracing::{info, warn};
// }}}

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
	pub timestamp: NaiveDateTime,
	pub identity: String,
	pub ehb: f64,
}

// {{{ Rows
/// `(timestamp, display name, ehb)`, in column order.
type RawRow = (String, String, f64);

fn parse_row((timestamp, identity, ehb): RawRow) -> Option<HistoryEntry> {
	Some(HistoryEntry {
		timestamp: NaiveDateTime::parse_from_str(&timestamp, TIMESTAMP_FORMAT).ok()?,
		identity,
		ehb: Some(ehb).filter(|v| v.is_finite())?,
	})
}
// }}}
// {{{ History log
#[derive(Debug, Clone)]
pub struct HistoryLog {
	path: PathBuf,

	/// Whether every append is reported at info level.
	announce: bool,
}

impl HistoryLog {
	pub fn new(path: PathBuf, announce: bool) -> Self {
		Self { path, announce }
	}

	#[inline]
	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn append(&self, identity: &str, ehb: f64, at: NaiveDateTime) -> anyhow::Result<()> {
		if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent)
				.with_context(|| format!("Could not create directory for {:?}", self.path))?;
		}

		let file = OpenOptions::new()
			.create(true)
			.append(true)
			.open(&self.path)
			.with_context(|| format!("Could not open EHB log at {:?}", self.path))?;

		let mut writer = csv::WriterBuilder::new()
			.has_headers(false)
			.from_writer(file);

		let timestamp = at.format(TIMESTAMP_FORMAT).to_string();
		let value = ehb.to_string();
		writer
			.write_record([timestamp.as_str(), identity, value.as_str()])
			.and_then(|()| writer.flush().map_err(csv::Error::from))
			.with_context(|| format!("Could not write to EHB log at {:?}", self.path))?;

		if self.announce {
			info!(member = %identity, ehb, path = ?self.path, "Logged EHB to csv");
		}

		Ok(())
	}

	/// Every well-formed row, in file order. A missing log reads as empty.
	pub fn read(&self) -> anyhow::Result<Vec<HistoryEntry>> {
		let file = match File::open(&self.path) {
			Ok(file) => file,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => {
				return Err(e).with_context(|| format!("Could not read EHB log at {:?}", self.path))
			}
		};

		let mut reader = csv::ReaderBuilder::new()
			.has_headers(false)
			.flexible(true)
			.trim(csv::Trim::All)
			.from_reader(file);

		let mut entries = Vec::new();
		for (index, row) in reader.deserialize::<RawRow>().enumerate() {
			match row.map(parse_row) {
				Ok(Some(entry)) => entries.push(entry),
				Ok(None) => warn!(row = index + 1, "Skipping EHB log row with a bad timestamp or value"),
				Err(e) if e.is_io_error() => {
					return Err(e).with_context(|| format!("Could not read EHB log at {:?}", self.path))
				}
				Err(e) => warn!(row = index + 1, "Skipping malformed EHB log row: {e}"),
			}
		}

		Ok(entries)
	}

	/// Rows for a single member (matched case-insensitively), oldest first.
	pub fn history_for(&self, identity: &str) -> anyhow::Result<Vec<HistoryEntry>> {
		let lowered = identity.to_lowercase();
		let mut entries: Vec<_> = self
			.read()?
			.into_iter()
			.filter(|entry| entry.identity.to_lowercase() == lowered)
			.collect();

		entries.sort_by_key(|entry| entry.timestamp);
		Ok(entries)
	}

	/// The newest `limit` rows across every member, newest first.
	pub fn recent(&self, limit: usize) -> anyhow::Result<Vec<HistoryEntry>> {
		let mut entries = self.read()?;
		entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
		entries.truncate(limit);
		Ok(entries)
	}

	/// The most recently logged value of each member.
	pub fn latest_per_member(&self) -> anyhow::Result<BTreeMap<String, f64>> {
		let mut latest: BTreeMap<String, (NaiveDateTime, f64)> = BTreeMap::new();

		for entry in self.read()? {
			let newer = latest
				.get(&entry.identity)
				.map_or(true, |(at, _)| *at <= entry.timestamp);

			if newer {
				latest.insert(entry.identity, (entry.timestamp, entry.ehb));
			}
		}

		Ok(latest
			.into_iter()
			.map(|(identity, (_, ehb))| (identity, ehb))
			.collect())
	}
}
// }}}
// {{{ Tests
#[cfg(test)]
mod history_tests {
	use chrono::NaiveDate;

	use super::*;

	fn at(day: u32, hour: u32) -> NaiveDateTime {
		NaiveDate::from_ymd_opt(2024, 3, day)
			.unwrap()
			.and_hms_opt(hour, 0, 0)
			.unwrap()
	}

	#[test]
	fn appends_rows_in_the_expected_format() {
		let dir = tempfile::tempdir().unwrap();
		let log = HistoryLog::new(dir.path().join("ehb_log.csv"), false);

		log.append("player", 123.0, at(1, 12)).unwrap();
		log.append("Lynx Titan", 4.25, at(2, 8)).unwrap();

		let contents = fs::read_to_string(log.path()).unwrap();
		assert_eq!(
			contents,
			"2024-03-01 12:00:00,player,123\n2024-03-02 08:00:00,Lynx Titan,4.25\n"
		);
	}

	#[test]
	fn missing_log_reads_as_empty() {
		let dir = tempfile::tempdir().unwrap();
		let log = HistoryLog::new(dir.path().join("nope.csv"), false);
		assert!(log.read().unwrap().is_empty());
		assert!(log.latest_per_member().unwrap().is_empty());
	}

	#[test]
	fn quotes_awkward_names_and_reads_them_back() {
		let dir = tempfile::tempdir().unwrap();
		let log = HistoryLog::new(dir.path().join("ehb_log.csv"), false);

		log.append("a, \"b\"", 1.5, at(1, 0)).unwrap();
		let entries = log.read().unwrap();
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].identity, "a, \"b\"");
		assert_eq!(entries[0].ehb, 1.5);
	}

	#[test]
	fn skips_malformed_rows() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("ehb_log.csv");
		fs::write(
			&path,
			"garbage\n2024-03-01 12:00:00,player,not-a-number\n2024-03-01 12:00:00,player,7\n,,\n",
		)
		.unwrap();

		let entries = HistoryLog::new(path, false).read().unwrap();
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].ehb, 7.0);
	}

	#[test]
	fn queries_by_member_and_recency() {
		let dir = tempfile::tempdir().unwrap();
		let log = HistoryLog::new(dir.path().join("ehb_log.csv"), false);

		log.append("Zezima", 10.0, at(3, 0)).unwrap();
		log.append("Lynx Titan", 50.0, at(1, 0)).unwrap();
		log.append("Zezima", 5.0, at(2, 0)).unwrap();

		let zezima: Vec<_> = log
			.history_for("zezima")
			.unwrap()
			.into_iter()
			.map(|e| e.ehb)
			.collect();
		assert_eq!(zezima, [5.0, 10.0]);

		let recent: Vec<_> = log
			.recent(2)
			.unwrap()
			.into_iter()
			.map(|e| e.identity)
			.collect();
		assert_eq!(recent, ["Zezima", "Zezima"]);

		let latest = log.latest_per_member().unwrap();
		assert_eq!(latest.get("Zezima"), Some(&10.0));
		assert_eq!(latest.get("Lynx Titan"), Some(&50.0));
	}
}
// }}}
