//! The bot's recurring work: rank checks, group listings and group
//! refreshes, plus the one-shot operations commands share with them.

// {{{ Imports
use std::time::Duration;

use chrono::Local;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::context::UserContext;
use crate::ranks::checker::{CheckError, CheckOutcome};
use crate::ranks::listing::{rank_members, render_listing};
use crate::ranks::notify::announce_all;
use crate::wom::RefreshOutcome;
// }}}

/// The group refresh runs once every this many rank checks.
pub const REFRESH_EVERY_CHECKS: u32 = 48;

// {{{ One-shot operations
/// Runs the checker once and announces whatever it promoted.
pub async fn check_and_announce(data: &UserContext) -> Result<CheckOutcome, CheckError> {
	let outcome = data.checker.run(data.source.as_ref()).await?;

	if let CheckOutcome::Completed(report) = &outcome {
		if !report.promotions.is_empty() {
			let delivered = announce_all(data.notifier.as_ref(), &report.promotions).await;
			debug!(delivered, total = report.promotions.len(), "Announced promotions");
		}
	}

	Ok(outcome)
}

/// Fetches the group and posts the full ranking table. Returns how many
/// messages were posted.
pub async fn post_listing(data: &UserContext) -> anyhow::Result<usize> {
	let group = data.source.fetch_group(data.group_id()).await?;
	let members = rank_members(&group, &data.ranks);
	let messages = render_listing(&group.name, Local::now().naive_local(), &members);

	if !data.config.settings.post_to_discord {
		info!(
			members = members.len(),
			"Posting to discord is disabled, not sending the ranking"
		);
		return Ok(0);
	}

	info!(messages = messages.len(), "Sending group ranking");
	for message in &messages {
		data.notifier.post(message).await?;
	}

	Ok(messages.len())
}

/// Asks the metric source to re-sync the group and reports the outcome to
/// the channel.
pub async fn refresh_and_report(data: &UserContext) -> RefreshOutcome {
	let outcome = data
		.source
		.refresh_group(data.group_id(), &data.config.wiseoldman.group_passcode)
		.await;

	match &outcome {
		RefreshOutcome::Failed(_) => warn!("{outcome}"),
		_ => info!("{outcome}"),
	}

	if data.config.settings.post_to_discord {
		if let Err(e) = data.notifier.post(&outcome.to_string()).await {
			warn!("Could not post group refresh outcome: {e:#}");
		}
	}

	outcome
}
// }}}
// {{{ Loops
fn ticker(period: Duration) -> tokio::time::Interval {
	let mut interval = tokio::time::interval(period);
	interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
	interval
}

/// Checks for rank changes every `check_interval` seconds, starting right
/// away. Never returns.
pub async fn rank_check_loop(data: UserContext) {
	let period = Duration::from_secs(data.config.settings.check_interval);
	let mut interval = ticker(period);

	loop {
		interval.tick().await;

		match check_and_announce(&data).await {
			Ok(CheckOutcome::Completed(_)) => {
				if !data.config.settings.silent {
					info!(
						"Next comparison in {:.0} minutes",
						period.as_secs_f64() / 60.0
					);
				}
			}
			Ok(CheckOutcome::Skipped) => {}
			Err(e) => error!("Error occurred during rank check: {e}"),
		}
	}
}

/// Refreshes the group once every [REFRESH_EVERY_CHECKS] check intervals,
/// starting right away. Never returns.
pub async fn group_refresh_loop(data: UserContext) {
	let period = Duration::from_secs(data.config.settings.check_interval) * REFRESH_EVERY_CHECKS;
	let mut interval = ticker(period);

	loop {
		interval.tick().await;
		refresh_and_report(&data).await;
	}
}

/// Posts the startup listing (when enabled) and spawns both loops.
pub async fn start(data: UserContext) {
	if data.config.settings.run_at_startup {
		info!("Listing all members and ranks at startup");
		if let Err(e) = post_listing(&data).await {
			error!("Error occurred while listing members and ranks: {e:#}");
		}
	}

	tokio::spawn(rank_check_loop(data.clone()));
	tokio::spawn(group_refresh_loop(data));
}
// }}}
// {{{ Tests
#[cfg(test)]
mod schedule_tests {
	use super::*;
	use crate::context::testing::{seed_state, test_context, test_context_in, FakeSource};

	#[tokio::test]
	async fn promotions_are_announced_after_the_save() {
		let dir = tempfile::tempdir().unwrap();
		let (data, fakes) =
			test_context(&dir, FakeSource::with_members(&[("Zezima", 150.0), ("Low", 5.0)]));
		seed_state(&data, &[("Zezima", 90.0, "Bronze", &["@fan"]), ("Low", 5.0, "Bronze", &[])])
			.await;

		let outcome = check_and_announce(&data).await.unwrap();
		assert!(matches!(outcome, CheckOutcome::Completed(_)));

		let events = fakes.notifier.events();
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].identity, "Zezima");
		assert_eq!(events[0].subscribers, ["@fan"]);

		let stored = data.checker.store().load().unwrap().state;
		assert_eq!(stored.get("Zezima").unwrap().rank, "Gold");
	}

	#[tokio::test]
	async fn failed_checks_announce_nothing() {
		let dir = tempfile::tempdir().unwrap();
		let (data, fakes) = test_context(&dir, FakeSource::failing());

		assert!(check_and_announce(&data).await.is_err());
		assert!(fakes.notifier.events().is_empty());
	}

	#[tokio::test]
	async fn unsaved_promotions_are_not_announced() {
		let dir = tempfile::tempdir().unwrap();
		let data_dir = dir.path().join("data");
		let (source, entered, release) = FakeSource::with_members(&[("Zezima", 150.0)]).gated();
		let (data, fakes) = test_context_in(&data_dir, source);
		seed_state(&data, &[("Zezima", 90.0, "Bronze", &["@fan"])]).await;

		let run = tokio::spawn({
			let data = data.clone();
			async move { check_and_announce(&data).await }
		});
		entered.notified().await;

		std::fs::rename(&data_dir, dir.path().join("moved")).unwrap();
		std::fs::write(&data_dir, "").unwrap();
		release.notify_one();

		assert!(matches!(run.await.unwrap(), Err(CheckError::Persist(_))));
		assert!(fakes.notifier.events().is_empty());
	}

	#[tokio::test]
	async fn listings_are_posted_in_order() {
		let dir = tempfile::tempdir().unwrap();
		let (data, fakes) =
			test_context(&dir, FakeSource::with_members(&[("Low", 5.0), ("High", 500.0)]));

		assert_eq!(post_listing(&data).await.unwrap(), 1);

		let posts = fakes.notifier.posts();
		assert!(posts[0].starts_with("**Rich Boys Ranking on "));
		let high = posts[0].find("High").unwrap();
		let low = posts[0].find("Low").unwrap();
		assert!(high < low);
	}

	#[tokio::test]
	async fn refresh_outcomes_are_posted() {
		let dir = tempfile::tempdir().unwrap();
		let (data, fakes) = test_context(&dir, FakeSource::default());
		fakes.source.set_refresh(RefreshOutcome::Updated(12));

		assert_eq!(refresh_and_report(&data).await, RefreshOutcome::Updated(12));
		assert_eq!(fakes.source.refreshes(), [(2300, "123-456-789".to_owned())]);
		assert_eq!(
			fakes.notifier.posts(),
			["✅ Successfully refreshed group data. 12 members updated."]
		);
	}

	#[tokio::test(start_paused = true)]
	async fn the_check_loop_runs_on_every_interval() {
		let dir = tempfile::tempdir().unwrap();
		let (data, fakes) = test_context(&dir, FakeSource::with_members(&[("Zezima", 1.0)]));

		let handle = tokio::spawn(rank_check_loop(data));
		tokio::time::sleep(Duration::from_secs(300 * 2 + 1)).await;
		handle.abort();

		assert_eq!(fakes.source.fetches(), 3);
	}
}
// }}}
