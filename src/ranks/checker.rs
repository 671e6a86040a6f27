//! Detects rank-ups by comparing a fresh group fetch against stored state.
//!
//! A run loads the state, fetches the group, walks every member and writes
//! the state back exactly once at the end. Nothing touches the disk before
//! that final save, so a failed fetch or a cancelled run leaves the previous
//! state as it was. Runs are single-flight: a run started while another is
//! in progress is skipped rather than queued. That holds across processes
//! too, through the state store's lock file. Fetches are bounded by a
//! timeout so a hung request cannot keep the guard forever.

// {{{ Imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::ranks::history::HistoryLog;
use crate::ranks::member::{round_ehb, RankState};
use crate::ranks::store::{SaveReport, StateLock, StateStore};
use crate::ranks::tier::RankTable;
use crate::timed;
use crate::wom::{FetchError, GroupSnapshot, MalformedMember, MemberMetric, MetricSource};
// }}}

// {{{ Run guard
/// Lets at most one holder through at a time, without waiting.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
	running: Arc<AtomicBool>,
}

/// Releases the [RunGuard] when dropped.
#[derive(Debug)]
pub struct RunPermit {
	running: Arc<AtomicBool>,
}

impl RunGuard {
	pub fn try_acquire(&self) -> Option<RunPermit> {
		self.running
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.ok()
			.map(|_| RunPermit {
				running: self.running.clone(),
			})
	}

	#[inline]
	pub fn is_running(&self) -> bool {
		self.running.load(Ordering::Acquire)
	}
}

impl Drop for RunPermit {
	fn drop(&mut self) {
		self.running.store(false, Ordering::Release);
	}
}
// }}}
// {{{ Results
#[derive(Debug, Clone, PartialEq)]
pub struct PromotionEvent {
	pub identity: String,
	pub old_rank: String,
	pub new_rank: String,
	pub ehb: f64,
	pub subscribers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberFailure {
	pub identity: Option<String>,
	pub reason: String,
}

impl From<MalformedMember> for MemberFailure {
	fn from(value: MalformedMember) -> Self {
		Self {
			identity: value.identity,
			reason: value.reason,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
	pub group_name: String,
	/// Members whose EHB went up this run.
	pub advanced: usize,
	pub promotions: Vec<PromotionEvent>,
	pub failures: Vec<MemberFailure>,
	pub save: SaveReport,
}

/// What a single-member update wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberUpdate {
	pub identity: String,
	pub ehb: f64,
	pub rank: String,
	pub subscribers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
	Completed(CheckReport),
	/// Another run (or a state edit) was already in progress.
	Skipped,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
	#[error("a rank check is already in progress")]
	Busy,
	#[error("could not load rank state: {0:#}")]
	Load(anyhow::Error),
	#[error("failed to fetch group details: {0}")]
	Fetch(#[from] FetchError),
	#[error("could not save rank state: {0:#}")]
	Persist(anyhow::Error),
}
// }}}
// {{{ Checker
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct RankChecker {
	group_id: u64,
	ranks: Arc<RankTable>,
	store: StateStore,
	history: Option<HistoryLog>,
	guard: RunGuard,
	fetch_timeout: Duration,
	silent: bool,
}

/// Both halves of exclusive access to the state file.
struct Exclusive {
	_lock: StateLock,
	_permit: RunPermit,
}

enum MemberChange {
	Unchanged,
	Advanced {
		ehb: f64,
		promotion: Option<PromotionEvent>,
	},
}

impl RankChecker {
	pub fn new(group_id: u64, ranks: Arc<RankTable>, store: StateStore) -> Self {
		Self {
			group_id,
			ranks,
			store,
			history: None,
			guard: RunGuard::default(),
			fetch_timeout: DEFAULT_FETCH_TIMEOUT,
			silent: false,
		}
	}

	/// How long a group fetch may take before the run gives up on it.
	pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
		self.fetch_timeout = timeout;
		self
	}

	/// Appends every advanced member to the given log.
	pub fn with_history(mut self, history: HistoryLog) -> Self {
		self.history = Some(history);
		self
	}

	/// Skips the per-run "fetched group" log line.
	pub fn silent(mut self, silent: bool) -> Self {
		self.silent = silent;
		self
	}

	#[inline]
	pub fn group_id(&self) -> u64 {
		self.group_id
	}

	#[inline]
	pub fn ranks(&self) -> &RankTable {
		&self.ranks
	}

	#[inline]
	pub fn store(&self) -> &StateStore {
		&self.store
	}

	#[inline]
	pub fn history(&self) -> Option<&HistoryLog> {
		self.history.as_ref()
	}

	#[inline]
	pub fn is_running(&self) -> bool {
		self.guard.is_running()
	}

	// {{{ Exclusive access
	/// Takes the in-process guard, then the lock shared with other processes.
	/// `None` if either is held elsewhere.
	fn try_exclusive(&self) -> Result<Option<Exclusive>, CheckError> {
		let Some(permit) = self.guard.try_acquire() else {
			return Ok(None);
		};

		match self.store.try_lock().map_err(CheckError::Load)? {
			Some(lock) => Ok(Some(Exclusive {
				_lock: lock,
				_permit: permit,
			})),
			None => {
				info!(path = ?self.store.lock_path(), "Rank state is locked by another process");
				Ok(None)
			}
		}
	}

	async fn fetch(&self, source: &dyn MetricSource) -> Result<GroupSnapshot, FetchError> {
		tokio::time::timeout(self.fetch_timeout, source.fetch_group(self.group_id))
			.await
			.map_err(|_| FetchError::TimedOut(self.fetch_timeout))?
	}
	// }}}
	// {{{ Run
	pub async fn run(&self, source: &dyn MetricSource) -> Result<CheckOutcome, CheckError> {
		let Some(_exclusive) = self.try_exclusive()? else {
			info!("Rank check already in progress, skipping");
			return Ok(CheckOutcome::Skipped);
		};

		timed!("rank_check", { self.run_exclusive(source).await }).map(CheckOutcome::Completed)
	}

	async fn run_exclusive(&self, source: &dyn MetricSource) -> Result<CheckReport, CheckError> {
		debug!("Starting player comparison");
		let loaded = self.store.load().map_err(CheckError::Load)?;
		let group = self.fetch(source).await?;

		if !self.silent {
			info!(
				group = %group.name,
				members = group.members.len(),
				"Fetched group details successfully"
			);
		}

		let mut state = loaded.state;
		let mut advanced = Vec::new();
		let mut promotions = Vec::new();
		let mut failures = Vec::new();

		for member in group.members {
			let outcome = member
				.map_err(MemberFailure::from)
				.and_then(|metric| {
					let change = self.process_member(&mut state, &metric)?;
					Ok((metric.identity, change))
				});

			match outcome {
				Ok((_, MemberChange::Unchanged)) => {}
				Ok((identity, MemberChange::Advanced { ehb, promotion })) => {
					advanced.push((identity, ehb));
					promotions.extend(promotion);
				}
				Err(failure) => {
					warn!(
						member = failure.identity.as_deref().unwrap_or("Unknown"),
						"Error processing player data: {}",
						failure.reason
					);
					failures.push(failure);
				}
			}
		}

		let save = self
			.store
			.save(&state, loaded.origin)
			.await
			.map_err(CheckError::Persist)?;

		// Only values that made it to disk get logged.
		if let Some(history) = &self.history {
			let at = Local::now().naive_local();
			for (identity, ehb) in &advanced {
				if let Err(e) = history.append(identity, *ehb, at) {
					warn!(member = %identity, "Could not log EHB to csv: {e:#}");
				}
			}
		}

		info!(
			advanced = advanced.len(),
			promotions = promotions.len(),
			failures = failures.len(),
			"Rank check completed successfully"
		);

		Ok(CheckReport {
			group_name: group.name,
			advanced: advanced.len(),
			promotions,
			failures,
			save,
		})
	}

	fn process_member(
		&self,
		state: &mut RankState,
		metric: &MemberMetric,
	) -> Result<MemberChange, MemberFailure> {
		if !metric.ehb.is_finite() || metric.ehb < 0.0 {
			return Err(MemberFailure {
				identity: Some(metric.identity.clone()),
				reason: format!("invalid EHB value {}", metric.ehb),
			});
		}

		let ehb = round_ehb(metric.ehb);
		let record = state.entry(&metric.identity);

		if ehb <= record.last_ehb {
			return Ok(MemberChange::Unchanged);
		}

		info!(
			member = %metric.identity,
			"Player EHB increased from {:.2} to {:.2}",
			record.last_ehb,
			ehb
		);

		let new_rank = self.ranks.classify(ehb);
		let old_rank = std::mem::replace(&mut record.rank, new_rank.to_owned());
		record.last_ehb = ehb;

		let promotion = (old_rank != new_rank).then(|| PromotionEvent {
			identity: metric.identity.clone(),
			old_rank,
			new_rank: new_rank.to_owned(),
			ehb,
			subscribers: record.subscribers.clone(),
		});

		Ok(MemberChange::Advanced { ehb, promotion })
	}
	// }}}
	// {{{ State edits
	/// Applies `edit` to the stored state under the same guard as [Self::run],
	/// then saves. Fails with [CheckError::Busy] instead of waiting.
	pub async fn edit_state<T>(
		&self,
		edit: impl FnOnce(&mut RankState) -> T,
	) -> Result<T, CheckError> {
		let Some(_exclusive) = self.try_exclusive()? else {
			return Err(CheckError::Busy);
		};

		let mut loaded = self.store.load().map_err(CheckError::Load)?;
		let result = edit(&mut loaded.state);
		self.store
			.save(&loaded.state, loaded.origin)
			.await
			.map_err(CheckError::Persist)?;

		Ok(result)
	}

	/// Overwrites one member's EHB and rank with live data, keeping their
	/// fans. Returns `None` when the group has no such member.
	pub async fn update_member(
		&self,
		source: &dyn MetricSource,
		name: &str,
	) -> Result<Option<MemberUpdate>, CheckError> {
		let Some(_exclusive) = self.try_exclusive()? else {
			return Err(CheckError::Busy);
		};

		let group = self.fetch(source).await?;
		let Some(metric) = group
			.well_formed()
			.find(|metric| metric.identity.eq_ignore_ascii_case(name))
		else {
			return Ok(None);
		};

		let ehb = round_ehb(metric.ehb);
		let rank = self.ranks.classify(ehb).to_owned();

		let mut loaded = self.store.load().map_err(CheckError::Load)?;
		let record = loaded.state.entry(&metric.identity);
		record.last_ehb = ehb;
		record.rank = rank.clone();
		let subscribers = record.subscribers.clone();

		self.store
			.save(&loaded.state, loaded.origin)
			.await
			.map_err(CheckError::Persist)?;

		info!(member = %metric.identity, ehb, rank = %rank, "Updated player");

		Ok(Some(MemberUpdate {
			identity: metric.identity.clone(),
			ehb,
			rank,
			subscribers,
		}))
	}
	// }}}
}
// }}}
// {{{ Tests
#[cfg(test)]
mod checker_tests {
	use std::fs;
	use std::path::Path;

	use super::*;
	use crate::context::testing::{bronze_gold, FakeSource, RecordingSync};
	use crate::ranks::member::MemberRecord;
	use crate::ranks::store::StateOrigin;

	fn checker_in(dir: &Path) -> RankChecker {
		let ranks = Arc::new(bronze_gold());
		let store = StateStore::new(dir.join("player_ranks.json"), ranks.clone());
		RankChecker::new(2300, ranks, store)
	}

	async fn seed(checker: &RankChecker, members: &[(&str, f64, &str)]) {
		let mut state = RankState::default();
		for (identity, ehb, rank) in members {
			state.insert(
				identity.to_string(),
				MemberRecord {
					last_ehb: *ehb,
					rank: rank.to_string(),
					subscribers: vec![format!("{identity}-fan")],
				},
			);
		}
		checker
			.store()
			.save(&state, StateOrigin::Fresh)
			.await
			.unwrap();
	}

	fn completed(outcome: CheckOutcome) -> CheckReport {
		match outcome {
			CheckOutcome::Completed(report) => report,
			CheckOutcome::Skipped => panic!("run was skipped"),
		}
	}

	#[tokio::test]
	async fn crossing_a_threshold_promotes() {
		let dir = tempfile::tempdir().unwrap();
		let checker = checker_in(dir.path());
		seed(&checker, &[("Zezima", 95.0, "Bronze")]).await;

		let source = FakeSource::with_members(&[("Zezima", 105.0)]);
		let report = completed(checker.run(&source).await.unwrap());

		assert_eq!(
			report.promotions,
			[PromotionEvent {
				identity: "Zezima".to_owned(),
				old_rank: "Bronze".to_owned(),
				new_rank: "Gold".to_owned(),
				ehb: 105.0,
				subscribers: vec!["Zezima-fan".to_owned()],
			}]
		);

		let stored = checker.store().load().unwrap().state;
		let record = stored.get("Zezima").unwrap();
		assert_eq!(record.last_ehb, 105.0);
		assert_eq!(record.rank, "Gold");
		assert_eq!(record.subscribers, ["Zezima-fan"]);
	}

	#[tokio::test]
	async fn increase_within_a_band_updates_silently() {
		let dir = tempfile::tempdir().unwrap();
		let checker = checker_in(dir.path());
		seed(&checker, &[("Zezima", 50.0, "Bronze")]).await;

		let source = FakeSource::with_members(&[("Zezima", 80.0)]);
		let report = completed(checker.run(&source).await.unwrap());

		assert!(report.promotions.is_empty());
		assert_eq!(report.advanced, 1);
		let stored = checker.store().load().unwrap().state;
		assert_eq!(stored.get("Zezima").unwrap().last_ehb, 80.0);
	}

	#[tokio::test]
	async fn unchanged_metrics_change_nothing() {
		let dir = tempfile::tempdir().unwrap();
		let sync = Arc::new(RecordingSync::default());
		let ranks = Arc::new(bronze_gold());
		let store =
			StateStore::new(dir.path().join("player_ranks.json"), ranks.clone()).with_sync(sync.clone());
		let checker = RankChecker::new(2300, ranks, store);
		seed(&checker, &[("Zezima", 50.0, "Bronze"), ("Lynx Titan", 150.0, "Gold")]).await;
		sync.clear();

		let before = fs::read(checker.store().path()).unwrap();
		let source = FakeSource::with_members(&[("Zezima", 50.0), ("Lynx Titan", 150.0)]);
		let report = completed(checker.run(&source).await.unwrap());

		assert!(report.promotions.is_empty());
		assert_eq!(report.advanced, 0);
		assert!(report.save.changed.is_empty());
		assert!(sync.upserted().is_empty());
		assert_eq!(fs::read(checker.store().path()).unwrap(), before);
	}

	#[tokio::test]
	async fn decreases_are_ignored() {
		let dir = tempfile::tempdir().unwrap();
		let checker = checker_in(dir.path());
		seed(&checker, &[("Zezima", 150.0, "Gold")]).await;

		let source = FakeSource::with_members(&[("Zezima", 20.0)]);
		let report = completed(checker.run(&source).await.unwrap());

		assert!(report.promotions.is_empty());
		let stored = checker.store().load().unwrap().state;
		assert_eq!(stored.get("Zezima").unwrap().last_ehb, 150.0);
		assert_eq!(stored.get("Zezima").unwrap().rank, "Gold");
	}

	#[tokio::test]
	async fn first_sighting_promotes_from_unknown() {
		let dir = tempfile::tempdir().unwrap();
		let checker = checker_in(dir.path());

		let source = FakeSource::with_members(&[("Newbie", 120.004), ("Idle", 0.0)]);
		let report = completed(checker.run(&source).await.unwrap());

		assert_eq!(report.promotions.len(), 1);
		assert_eq!(report.promotions[0].old_rank, "Unknown");
		assert_eq!(report.promotions[0].new_rank, "Gold");
		assert_eq!(report.promotions[0].ehb, 120.0);

		let stored = checker.store().load().unwrap().state;
		assert_eq!(stored.get("Idle"), Some(&MemberRecord::default()));
	}

	#[tokio::test]
	async fn absent_members_are_left_alone() {
		let dir = tempfile::tempdir().unwrap();
		let checker = checker_in(dir.path());
		seed(&checker, &[("Left", 30.0, "Bronze"), ("Stayed", 10.0, "Bronze")]).await;

		let source = FakeSource::with_members(&[("Stayed", 11.0)]);
		completed(checker.run(&source).await.unwrap());

		let stored = checker.store().load().unwrap().state;
		assert_eq!(stored.get("Left").unwrap().last_ehb, 30.0);
		assert_eq!(stored.get("Stayed").unwrap().last_ehb, 11.0);
	}

	#[tokio::test]
	async fn broken_members_do_not_stop_the_run() {
		let dir = tempfile::tempdir().unwrap();
		let checker = checker_in(dir.path());

		let source = FakeSource::with_members(&[("Negative", -3.0), ("Fine", 101.0)]);
		source.push_malformed(Some("Broken"), "missing ehb");

		let report = completed(checker.run(&source).await.unwrap());
		assert_eq!(report.failures.len(), 2);
		assert_eq!(report.promotions.len(), 1);
		assert_eq!(report.promotions[0].identity, "Fine");

		let failed: Vec<_> = report
			.failures
			.iter()
			.map(|f| f.identity.as_deref())
			.collect();
		assert_eq!(failed, [Some("Negative"), Some("Broken")]);
	}

	#[tokio::test]
	async fn failed_fetch_keeps_state_byte_for_byte() {
		let dir = tempfile::tempdir().unwrap();
		let checker = checker_in(dir.path());
		seed(&checker, &[("Zezima", 95.0, "Bronze")]).await;
		let before = fs::read(checker.store().path()).unwrap();

		let source = FakeSource::failing();
		let result = checker.run(&source).await;

		assert!(matches!(result, Err(CheckError::Fetch(_))));
		assert_eq!(fs::read(checker.store().path()).unwrap(), before);
		assert!(!checker.is_running());
	}

	#[tokio::test(start_paused = true)]
	async fn hung_fetches_time_out_and_free_the_guard() {
		let dir = tempfile::tempdir().unwrap();
		let checker = checker_in(dir.path()).with_fetch_timeout(Duration::from_secs(30));
		seed(&checker, &[("Zezima", 95.0, "Bronze")]).await;
		let before = fs::read(checker.store().path()).unwrap();

		// Nobody ever releases this one.
		let (hung, _entered, _release) = FakeSource::with_members(&[("Zezima", 105.0)]).gated();
		let result = checker.run(&hung).await;

		assert!(matches!(
			result,
			Err(CheckError::Fetch(FetchError::TimedOut(_)))
		));
		assert!(!checker.is_running());
		assert_eq!(fs::read(checker.store().path()).unwrap(), before);

		let source = FakeSource::with_members(&[("Zezima", 105.0)]);
		let report = completed(checker.run(&source).await.unwrap());
		assert_eq!(report.promotions.len(), 1);
	}

	#[tokio::test]
	async fn failed_saves_leave_state_and_history_alone() {
		let dir = tempfile::tempdir().unwrap();
		let data = dir.path().join("data");
		let history = HistoryLog::new(data.join("ehb_log.csv"), false);
		let checker = Arc::new(checker_in(&data).with_history(history));
		seed(&checker, &[("Zezima", 95.0, "Bronze")]).await;
		let before = fs::read(checker.store().path()).unwrap();

		let (source, entered, release) = FakeSource::with_members(&[("Zezima", 105.0)]).gated();
		let run = tokio::spawn({
			let checker = checker.clone();
			async move { checker.run(&source).await }
		});
		entered.notified().await;

		// Swap the data directory for a plain file while the run is fetching.
		let moved = dir.path().join("moved");
		fs::rename(&data, &moved).unwrap();
		fs::write(&data, "").unwrap();
		release.notify_one();

		let result = run.await.unwrap();
		assert!(matches!(result, Err(CheckError::Persist(_))));
		assert!(!checker.is_running());
		assert_eq!(fs::read(moved.join("player_ranks.json")).unwrap(), before);
		assert!(!moved.join("ehb_log.csv").exists());
	}

	#[tokio::test]
	async fn runs_skip_while_another_process_holds_the_state() {
		let dir = tempfile::tempdir().unwrap();
		let checker = checker_in(dir.path());
		let elsewhere = StateStore::new(checker.store().path().to_owned(), Arc::new(bronze_gold()));
		let held = elsewhere.try_lock().unwrap().unwrap();

		let source = FakeSource::with_members(&[("Zezima", 105.0)]);
		assert_eq!(checker.run(&source).await.unwrap(), CheckOutcome::Skipped);
		assert!(matches!(
			checker.update_member(&source, "Zezima").await,
			Err(CheckError::Busy)
		));
		assert_eq!(source.fetches(), 0);
		assert!(!checker.is_running());

		drop(held);
		let report = completed(checker.run(&source).await.unwrap());
		assert_eq!(report.promotions.len(), 1);
	}

	#[tokio::test]
	async fn advanced_members_are_logged_to_history() {
		let dir = tempfile::tempdir().unwrap();
		let history = HistoryLog::new(dir.path().join("ehb_log.csv"), false);
		let checker = checker_in(dir.path()).with_history(history.clone());
		seed(&checker, &[("Same", 10.0, "Bronze"), ("Up", 10.0, "Bronze")]).await;

		let source = FakeSource::with_members(&[("Same", 10.0), ("Up", 12.345)]);
		completed(checker.run(&source).await.unwrap());

		let entries = history.read().unwrap();
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].identity, "Up");
		assert_eq!(entries[0].ehb, 12.35);
	}

	#[tokio::test]
	async fn concurrent_runs_are_single_flight() {
		let dir = tempfile::tempdir().unwrap();
		let checker = Arc::new(checker_in(dir.path()));

		let (source, entered, release) = FakeSource::with_members(&[("Zezima", 105.0)]).gated();
		let source = Arc::new(source);

		let first = tokio::spawn({
			let checker = checker.clone();
			let source = source.clone();
			async move { checker.run(source.as_ref()).await }
		});

		entered.notified().await;
		assert!(checker.is_running());

		let other = FakeSource::with_members(&[("Zezima", 500.0)]);
		assert_eq!(checker.run(&other).await.unwrap(), CheckOutcome::Skipped);
		assert!(matches!(
			checker.edit_state(|state| state.subscribe_all("fan")).await,
			Err(CheckError::Busy)
		));

		release.notify_one();
		let report = completed(first.await.unwrap().unwrap());
		assert_eq!(report.promotions.len(), 1);
		assert_eq!(other.fetches(), 0);

		let stored = checker.store().load().unwrap().state;
		assert_eq!(stored.get("Zezima").unwrap().last_ehb, 105.0);
		assert!(!checker.is_running());
	}

	#[tokio::test]
	async fn updating_a_member_keeps_their_fans() {
		let dir = tempfile::tempdir().unwrap();
		let checker = checker_in(dir.path());
		seed(&checker, &[("Zezima", 150.0, "Gold")]).await;

		let source = FakeSource::with_members(&[("Zezima", 42.424)]);
		let update = checker.update_member(&source, "zEZIMA").await.unwrap();
		assert_eq!(
			update,
			Some(MemberUpdate {
				identity: "Zezima".to_owned(),
				ehb: 42.42,
				rank: "Bronze".to_owned(),
				subscribers: vec!["Zezima-fan".to_owned()],
			})
		);

		let stored = checker.store().load().unwrap().state;
		let record = stored.get("Zezima").unwrap();
		assert_eq!(record.last_ehb, 42.42);
		assert_eq!(record.rank, "Bronze");
		assert_eq!(record.subscribers, ["Zezima-fan"]);

		assert_eq!(checker.update_member(&source, "nobody").await.unwrap(), None);
	}

	#[tokio::test]
	async fn edits_go_through_the_store() {
		let dir = tempfile::tempdir().unwrap();
		let checker = checker_in(dir.path());
		seed(&checker, &[("a", 1.0, "Bronze"), ("b", 2.0, "Bronze")]).await;

		let count = checker
			.edit_state(|state| state.subscribe_all("fan"))
			.await
			.unwrap();
		assert_eq!(count, 2);

		let stored = checker.store().load().unwrap().state;
		assert!(stored
			.iter()
			.all(|(_, record)| record.subscribers.iter().any(|s| s == "fan")));
	}
}
// }}}
