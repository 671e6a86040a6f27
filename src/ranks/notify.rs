//! Where promotions end up once a run has been saved.

// {{{ Imports
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, Http};
use tracing::{debug, info, warn};

use crate::ranks::checker::PromotionEvent;
// }}}

// {{{ Formatting
/// Fans as shown in rank-up announcements.
pub fn announcement_fans(subscribers: &[String]) -> String {
	if subscribers.is_empty() {
		"0 😭😭😭".to_owned()
	} else {
		subscribers.join("  ")
	}
}

/// Fans as shown in lookups.
pub fn lookup_fans(subscribers: &[String]) -> String {
	if subscribers.is_empty() {
		"0 😭".to_owned()
	} else {
		subscribers.join(" + ")
	}
}

pub fn rank_up_message(event: &PromotionEvent) -> String {
	format!(
		"🎉 Congratulations **{}** on moving up to the rank of **{}** with **{}** EHB! 🎉\n**Fans:** {}",
		event.identity,
		event.new_rank,
		event.ehb,
		announcement_fans(&event.subscribers)
	)
}
// }}}
// {{{ Seam
#[async_trait]
pub trait Notifier: Send + Sync {
	/// Announces a single promotion.
	async fn notify(&self, event: &PromotionEvent) -> anyhow::Result<()>;

	/// Posts free-form text to the same place promotions go.
	async fn post(&self, text: &str) -> anyhow::Result<()>;
}

/// Hands every event to `notifier`, logging failures instead of returning
/// them. Returns how many were delivered.
pub async fn announce_all(notifier: &dyn Notifier, events: &[PromotionEvent]) -> usize {
	let mut delivered = 0;
	for event in events {
		match notifier.notify(event).await {
			Ok(()) => delivered += 1,
			Err(e) => warn!(member = %event.identity, "Error sending rank up message: {e:#}"),
		}
	}
	delivered
}
// }}}
// {{{ Discord
/// Posts into a single configured channel.
pub struct DiscordNotifier {
	http: Arc<Http>,
	channel: ChannelId,
	post_to_discord: bool,
}

impl DiscordNotifier {
	pub fn new(http: Arc<Http>, channel_id: u64, post_to_discord: bool) -> Self {
		Self {
			http,
			channel: ChannelId::new(channel_id),
			post_to_discord,
		}
	}
}

#[async_trait]
impl Notifier for DiscordNotifier {
	async fn notify(&self, event: &PromotionEvent) -> anyhow::Result<()> {
		if !self.post_to_discord {
			debug!(member = %event.identity, "Posting to discord is disabled, not announcing");
			return Ok(());
		}

		self.post(&rank_up_message(event)).await?;
		info!(member = %event.identity, channel = %self.channel, "Sent rank up message");
		Ok(())
	}

	async fn post(&self, text: &str) -> anyhow::Result<()> {
		self.channel
			.say(&*self.http, text)
			.await
			.with_context(|| format!("Could not send message to channel {}", self.channel))?;
		Ok(())
	}
}
// }}}
