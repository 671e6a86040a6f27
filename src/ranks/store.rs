//! Durable storage for [RankState].
//!
//! The whole state is rewritten on every save. Writes go to a temporary file
//! in the same directory which is then renamed over the old one, so a crash
//! mid-write leaves the previous state in place.
//!
//! Processes sharing a state file (the bot and the CLI) coordinate through
//! an advisory lock on a `.lock` file next to it, see [StateStore::try_lock].

// {{{ Imports
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use fs2::FileExt;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::ranks::history::HistoryLog;
use crate::ranks::member::{round_ehb, MemberRecord, RankState};
use crate::ranks::tier::RankTable;
// }}}

// {{{ Table sync seam
/// An external table mirroring every member's latest rank and EHB.
#[async_trait]
pub trait TableSync: Send + Sync {
	async fn upsert(&self, identity: &str, record: &MemberRecord) -> anyhow::Result<()>;
}
// }}}
// {{{ Load / save results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOrigin {
	/// Read from the state file.
	Stored,
	/// No state file existed and there was no history to rebuild from.
	Fresh,
	/// The state file could not be parsed and was discarded.
	Reset,
	/// Rebuilt from the EHB history log. Saving such a state does not
	/// count as a change, so external sync is skipped.
	Reconstructed,
}

#[derive(Debug, Clone)]
pub struct LoadedState {
	pub state: RankState,
	pub origin: StateOrigin,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
	/// Members whose EHB differs from what was on disk before the write.
	/// Members seen for the first time only count once they have any EHB.
	pub changed: Vec<String>,
	/// How many of those were pushed to the external table.
	pub synced: usize,
}
// }}}
// {{{ Cross-process lock
/// Exclusive hold on a state file's lock file. Released on drop.
#[derive(Debug)]
pub struct StateLock {
	file: File,
}

impl Drop for StateLock {
	fn drop(&mut self) {
		if let Err(e) = FileExt::unlock(&self.file) {
			warn!("Could not release the rank state lock: {e}");
		}
	}
}
// }}}
// {{{ State store
#[derive(Clone)]
pub struct StateStore {
	path: PathBuf,
	ranks: Arc<RankTable>,
	history: Option<HistoryLog>,
	sync: Option<Arc<dyn TableSync>>,
}

impl StateStore {
	pub fn new(path: PathBuf, ranks: Arc<RankTable>) -> Self {
		Self {
			path,
			ranks,
			history: None,
			sync: None,
		}
	}

	/// Lets a missing or corrupt state file be rebuilt from the EHB log.
	pub fn with_history(mut self, history: HistoryLog) -> Self {
		self.history = Some(history);
		self
	}

	pub fn with_sync(mut self, sync: Arc<dyn TableSync>) -> Self {
		self.sync = Some(sync);
		self
	}

	#[inline]
	pub fn path(&self) -> &Path {
		&self.path
	}

	#[inline]
	pub fn history(&self) -> Option<&HistoryLog> {
		self.history.as_ref()
	}

	pub fn lock_path(&self) -> PathBuf {
		let mut name = self.path.as_os_str().to_owned();
		name.push(".lock");
		PathBuf::from(name)
	}

	/// Takes the advisory lock every process using this state file agrees
	/// on, without waiting. Returns `None` while someone else holds it.
	pub fn try_lock(&self) -> anyhow::Result<Option<StateLock>> {
		let path = self.lock_path();
		if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(dir).with_context(|| format!("Could not create {dir:?}"))?;
		}

		let file = OpenOptions::new()
			.create(true)
			.truncate(false)
			.write(true)
			.open(&path)
			.with_context(|| format!("Could not open rank state lock at {path:?}"))?;

		match file.try_lock_exclusive() {
			Ok(()) => Ok(Some(StateLock { file })),
			Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
			Err(e) => Err(e).with_context(|| format!("Could not lock {path:?}")),
		}
	}

	// {{{ Reading
	/// `Ok(None)` when there is no state file yet. Parse failures are
	/// reported as errors so callers can tell them apart.
	fn read_file(&self) -> Result<Option<RankState>, ReadError> {
		let contents = match fs::read_to_string(&self.path) {
			Ok(contents) => contents,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(ReadError::Io(e)),
		};

		serde_json::from_str(&contents)
			.map(Some)
			.map_err(ReadError::Corrupt)
	}

	/// Loads the persisted state. A missing file yields an empty state and a
	/// corrupt one is discarded. Only an unreadable file is an error, since
	/// saving over it would destroy data we never looked at.
	pub fn load(&self) -> anyhow::Result<LoadedState> {
		match self.read_file() {
			Ok(Some(state)) => Ok(LoadedState {
				state,
				origin: StateOrigin::Stored,
			}),
			Ok(None) => Ok(self.fallback(StateOrigin::Fresh)),
			Err(ReadError::Corrupt(e)) => {
				error!(path = ?self.path, "Rank state is empty or corrupted ({e}). Resetting data.");
				Ok(self.fallback(StateOrigin::Reset))
			}
			Err(ReadError::Io(e)) => {
				Err(e).with_context(|| format!("Could not read rank state at {:?}", self.path))
			}
		}
	}

	fn fallback(&self, origin: StateOrigin) -> LoadedState {
		let empty = LoadedState {
			state: RankState::default(),
			origin,
		};

		let Some(history) = &self.history else {
			return empty;
		};

		match history.latest_per_member() {
			Ok(latest) if latest.is_empty() => empty,
			Ok(latest) => {
				let mut state = RankState::default();
				for (identity, ehb) in latest {
					let ehb = round_ehb(ehb);
					state.insert(
						identity,
						MemberRecord {
							last_ehb: ehb,
							rank: self.ranks.classify(ehb).to_owned(),
							subscribers: Vec::new(),
						},
					);
				}

				info!(
					members = state.len(),
					path = ?history.path(),
					"Rebuilt rank state from the EHB log"
				);

				LoadedState {
					state,
					origin: StateOrigin::Reconstructed,
				}
			}
			Err(e) => {
				warn!("Could not rebuild rank state from the EHB log: {e:#}");
				empty
			}
		}
	}
	// }}}
	// {{{ Writing
	fn write_atomic(&self, state: &RankState) -> anyhow::Result<()> {
		let dir = match self.path.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent,
			_ => Path::new("."),
		};

		fs::create_dir_all(dir).with_context(|| format!("Could not create {dir:?}"))?;

		let file = tempfile::NamedTempFile::new_in(dir)
			.with_context(|| format!("Could not create a temporary file in {dir:?}"))?;

		{
			let mut writer = BufWriter::new(file.as_file());
			let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
			let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
			state
				.serialize(&mut serializer)
				.context("Could not serialize rank state")?;
			writer.flush().context("Could not write rank state")?;
		}

		file.as_file()
			.sync_all()
			.context("Could not flush rank state to disk")?;
		file.persist(&self.path)
			.with_context(|| format!("Could not replace rank state at {:?}", self.path))?;

		Ok(())
	}

	/// Rewrites the state file, then pushes every member whose EHB changed
	/// since the previous write to the external table (unless `origin` says
	/// the state was rebuilt from history). Sync failures are logged only.
	pub async fn save(&self, state: &RankState, origin: StateOrigin) -> anyhow::Result<SaveReport> {
		let previous = self.read_file().ok().flatten().unwrap_or_default();

		self.write_atomic(state)?;

		let changed: Vec<String> = state
			.iter()
			.filter(|(identity, record)| {
				previous
					.get(identity)
					.map_or(record.last_ehb > 0.0, |before| before.last_ehb != record.last_ehb)
			})
			.map(|(identity, _)| identity.to_owned())
			.collect();

		let mut report = SaveReport {
			changed,
			synced: 0,
		};

		let Some(sync) = &self.sync else {
			return Ok(report);
		};

		if origin == StateOrigin::Reconstructed {
			debug!(
				changed = report.changed.len(),
				"Skipping table sync for a state rebuilt from history"
			);
			return Ok(report);
		}

		for identity in &report.changed {
			let Some(record) = state.get(identity) else {
				continue;
			};

			match sync.upsert(identity, record).await {
				Ok(()) => report.synced += 1,
				Err(e) => warn!(member = %identity, "Could not sync member to the players table: {e:#}"),
			}
		}

		Ok(report)
	}
	// }}}
}

enum ReadError {
	Io(std::io::Error),
	Corrupt(serde_json::Error),
}
// }}}
// {{{ Tests
#[cfg(test)]
mod store_tests {
	use chrono::NaiveDate;

	use super::*;
	use crate::context::testing::{bronze_gold, RecordingSync};

	fn store_in(dir: &Path) -> StateStore {
		StateStore::new(dir.join("player_ranks.json"), Arc::new(bronze_gold()))
	}

	fn record(ehb: f64, rank: &str) -> MemberRecord {
		MemberRecord {
			last_ehb: ehb,
			rank: rank.to_owned(),
			subscribers: Vec::new(),
		}
	}

	#[test]
	fn missing_file_loads_empty() {
		let dir = tempfile::tempdir().unwrap();
		let loaded = store_in(dir.path()).load().unwrap();
		assert!(loaded.state.is_empty());
		assert_eq!(loaded.origin, StateOrigin::Fresh);
	}

	#[tokio::test]
	async fn corrupt_file_resets_and_is_overwritten() {
		let dir = tempfile::tempdir().unwrap();
		let store = store_in(dir.path());
		fs::write(store.path(), "{ this is not json").unwrap();

		let loaded = store.load().unwrap();
		assert!(loaded.state.is_empty());
		assert_eq!(loaded.origin, StateOrigin::Reset);

		let mut state = loaded.state;
		state.insert("Zezima".to_owned(), record(5.0, "Bronze"));
		store.save(&state, loaded.origin).await.unwrap();

		let reloaded = store.load().unwrap();
		assert_eq!(reloaded.origin, StateOrigin::Stored);
		assert_eq!(reloaded.state, state);
	}

	#[tokio::test]
	async fn empty_file_counts_as_corrupt() {
		let dir = tempfile::tempdir().unwrap();
		let store = store_in(dir.path());
		fs::write(store.path(), "").unwrap();
		assert_eq!(store.load().unwrap().origin, StateOrigin::Reset);
	}

	#[tokio::test]
	async fn save_then_load_round_trips_and_normalizes() {
		let dir = tempfile::tempdir().unwrap();
		let store = store_in(dir.path());
		fs::write(
			store.path(),
			r#"{"Zezima": {"last_ehb": 95.5, "rank": "Bronze", "discord_name": "fan"}}"#,
		)
		.unwrap();

		let loaded = store.load().unwrap();
		store.save(&loaded.state, loaded.origin).await.unwrap();

		let written = fs::read_to_string(store.path()).unwrap();
		assert!(written.contains(r#""discord_name": ["#));

		let reloaded = store.load().unwrap();
		assert_eq!(reloaded.state, loaded.state);
		assert_eq!(reloaded.state.get("Zezima").unwrap().subscribers, ["fan"]);
	}

	#[tokio::test]
	async fn syncs_only_members_whose_ehb_changed() {
		let dir = tempfile::tempdir().unwrap();
		let sync = Arc::new(RecordingSync::default());
		let store = store_in(dir.path()).with_sync(sync.clone());

		let mut state = RankState::default();
		state.insert("a".to_owned(), record(1.0, "Bronze"));
		state.insert("b".to_owned(), record(2.0, "Bronze"));
		let report = store.save(&state, StateOrigin::Fresh).await.unwrap();
		assert_eq!(report.changed, ["a", "b"]);
		assert_eq!(sync.upserted(), ["a", "b"]);

		sync.clear();
		state.entry("b").last_ehb = 3.0;
		state.entry("a").subscribers.push("fan".to_owned());
		let report = store.save(&state, StateOrigin::Stored).await.unwrap();
		assert_eq!(report.changed, ["b"]);
		assert_eq!(report.synced, 1);
		assert_eq!(sync.upserted(), ["b"]);

		sync.clear();
		let report = store.save(&state, StateOrigin::Stored).await.unwrap();
		assert!(report.changed.is_empty());
		assert!(sync.upserted().is_empty());
	}

	#[tokio::test]
	async fn idle_newcomers_are_not_synced() {
		let dir = tempfile::tempdir().unwrap();
		let sync = Arc::new(RecordingSync::default());
		let store = store_in(dir.path()).with_sync(sync.clone());

		let mut state = RankState::default();
		state.entry("Idle");
		state.insert("Active".to_owned(), record(4.0, "Bronze"));
		let report = store.save(&state, StateOrigin::Fresh).await.unwrap();

		assert_eq!(report.changed, ["Active"]);
		assert_eq!(sync.upserted(), ["Active"]);
		assert!(store.load().unwrap().state.get("Idle").is_some());

		sync.clear();
		state.entry("Idle").last_ehb = 0.5;
		let report = store.save(&state, StateOrigin::Stored).await.unwrap();
		assert_eq!(report.changed, ["Idle"]);
	}

	#[test]
	fn the_lock_excludes_other_holders_until_dropped() {
		let dir = tempfile::tempdir().unwrap();
		let ours = store_in(dir.path());
		let theirs = store_in(dir.path());

		let held = ours.try_lock().unwrap();
		assert!(held.is_some());
		assert!(theirs.try_lock().unwrap().is_none());

		drop(held);
		assert!(theirs.try_lock().unwrap().is_some());
		assert!(dir.path().join("player_ranks.json.lock").exists());
	}

	#[tokio::test]
	async fn sync_failures_do_not_fail_the_save() {
		let dir = tempfile::tempdir().unwrap();
		let sync = Arc::new(RecordingSync::failing());
		let store = store_in(dir.path()).with_sync(sync.clone());

		let mut state = RankState::default();
		state.insert("a".to_owned(), record(1.0, "Bronze"));
		let report = store.save(&state, StateOrigin::Stored).await.unwrap();
		assert_eq!(report.synced, 0);
		assert_eq!(store.load().unwrap().state, state);
	}

	#[tokio::test]
	async fn rebuilds_from_history_without_syncing() {
		let dir = tempfile::tempdir().unwrap();
		let history = HistoryLog::new(dir.path().join("ehb_log.csv"), false);
		let at = |day| {
			NaiveDate::from_ymd_opt(2024, 5, day)
				.unwrap()
				.and_hms_opt(0, 0, 0)
				.unwrap()
		};
		history.append("Zezima", 40.0, at(1)).unwrap();
		history.append("Zezima", 120.456, at(2)).unwrap();
		history.append("Lynx Titan", 12.0, at(1)).unwrap();

		let sync = Arc::new(RecordingSync::default());
		let store = store_in(dir.path())
			.with_history(history)
			.with_sync(sync.clone());

		let loaded = store.load().unwrap();
		assert_eq!(loaded.origin, StateOrigin::Reconstructed);
		assert_eq!(loaded.state.get("Zezima"), Some(&record(120.46, "Gold")));
		assert_eq!(loaded.state.get("Lynx Titan"), Some(&record(12.0, "Bronze")));

		let report = store.save(&loaded.state, loaded.origin).await.unwrap();
		assert_eq!(report.changed.len(), 2);
		assert!(sync.upserted().is_empty());
	}

	#[tokio::test]
	async fn writes_four_space_indented_json() {
		let dir = tempfile::tempdir().unwrap();
		let store = store_in(dir.path());
		let mut state = RankState::default();
		state.insert("a".to_owned(), record(1.0, "Bronze"));
		store.save(&state, StateOrigin::Fresh).await.unwrap();

		let written = fs::read_to_string(store.path()).unwrap();
		assert!(written.starts_with("{\n    \"a\": {\n        \"last_ehb\""));
	}
}
// }}}
