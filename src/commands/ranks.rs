// {{{ Imports
use anyhow::anyhow;

use crate::context::{Error, ErrorKind, PoiseContext, TagError, TaggedError};
use crate::ranks::checker::{CheckError, CheckOutcome};
use crate::ranks::notify::lookup_fans;
use crate::schedule::{check_and_announce, post_listing};

use super::discord::MessageContext;
// }}}

/// Turns checker errors into replies, with contention reported as a user error.
pub(super) fn tag_check_error(error: CheckError) -> TaggedError {
	match error {
		CheckError::Busy => {
			anyhow!("⏳ A rank check is in progress. Try again in a moment.").tag(ErrorKind::User)
		}
		CheckError::Fetch(e) => {
			anyhow!("❌ Failed to fetch group details: {e}").tag(ErrorKind::User)
		}
		other => TaggedError::from(other),
	}
}

fn not_found(username: &str) -> TaggedError {
	anyhow!("❌ Username **'{username}'** not found in the ranks data.").tag(ErrorKind::User)
}

// {{{ Lookup
// {{{ Implementation
pub async fn lookup_impl<C: MessageContext>(
	ctx: &mut C,
	username: &str,
) -> Result<(), TaggedError> {
	let state = ctx.data().checker.store().load()?.state;
	let (identity, record) = state.find(username).ok_or_else(|| not_found(username))?;

	let message = format!(
		"**{identity}**\n**Rank:** {} ({} EHB)\n**Fans:** {}",
		record.rank,
		record.last_ehb,
		lookup_fans(&record.subscribers)
	);
	ctx.reply(&message).await?;

	Ok(())
}
// }}}
// {{{ Discord wrapper
/// Lists the rank and EHB for a specific user.
#[poise::command(slash_command)]
pub async fn lookup(
	mut ctx: PoiseContext<'_>,
	#[description = "Wise Old Man username"] username: String,
) -> Result<(), Error> {
	let res = lookup_impl(&mut ctx, &username).await;
	ctx.handle_error(res).await?;
	Ok(())
}
// }}}
// }}}
// {{{ Rankup
// {{{ Implementation
pub async fn rankup_impl<C: MessageContext>(
	ctx: &mut C,
	username: &str,
) -> Result<(), TaggedError> {
	let state = ctx.data().checker.store().load()?.state;
	let (identity, record) = state.find(username).ok_or_else(|| not_found(username))?;

	let message = format!(
		"🔹 **Player:** {identity}\n🏅 **Current Rank:** {} ({} EHB)\n📈 **Next Rank:** {}",
		record.rank,
		record.last_ehb,
		ctx.data().ranks.next_rank(&record.rank)
	);
	ctx.reply(&message).await?;

	Ok(())
}
// }}}
// {{{ Discord wrapper
/// Displays the current rank, EHB, and next rank for a player.
#[poise::command(slash_command)]
pub async fn rankup(
	mut ctx: PoiseContext<'_>,
	#[description = "Wise Old Man username"] username: String,
) -> Result<(), Error> {
	let res = rankup_impl(&mut ctx, &username).await;
	ctx.handle_error(res).await?;
	Ok(())
}
// }}}
// }}}
// {{{ Update
// {{{ Implementation
pub async fn update_impl<C: MessageContext>(
	ctx: &mut C,
	username: &str,
) -> Result<(), TaggedError> {
	let data = ctx.data();
	let update = data
		.checker
		.update_member(data.source.as_ref(), username)
		.await
		.map_err(tag_check_error)?
		.ok_or_else(|| {
			anyhow!("❌ Could not find a player with username **{username}** in the group.")
				.tag(ErrorKind::User)
		})?;

	let message = format!(
		"✅ **{}** \n**Rank:** {} ({} EHB)\n**Fans:** {}",
		update.identity,
		update.rank,
		update.ehb,
		lookup_fans(&update.subscribers)
	);
	ctx.reply(&message).await?;

	Ok(())
}
// }}}
// {{{ Discord wrapper
/// Fetches and updates the rank for a specific user.
#[poise::command(slash_command)]
pub async fn update(
	mut ctx: PoiseContext<'_>,
	#[description = "Wise Old Man username"] username: String,
) -> Result<(), Error> {
	ctx.defer().await?;
	let res = update_impl(&mut ctx, &username).await;
	ctx.handle_error(res).await?;
	Ok(())
}
// }}}
// }}}
// {{{ Refresh
// {{{ Implementation
pub async fn refresh_impl<C: MessageContext>(ctx: &mut C) -> Result<(), TaggedError> {
	post_listing(ctx.data())
		.await
		.map_err(|e| anyhow!("❌ Error refreshing rankings: {e:#}").tag(ErrorKind::User))?;

	ctx.reply("✅ Refreshed rankings.").await?;
	Ok(())
}
// }}}
// {{{ Discord wrapper
/// Refreshes and posts the updated group rankings.
#[poise::command(slash_command)]
pub async fn refresh(mut ctx: PoiseContext<'_>) -> Result<(), Error> {
	ctx.defer().await?;
	let res = refresh_impl(&mut ctx).await;
	ctx.handle_error(res).await?;
	Ok(())
}
// }}}
// }}}
// {{{ Forcecheck
// {{{ Implementation
pub async fn forcecheck_impl<C: MessageContext>(ctx: &mut C) -> Result<(), TaggedError> {
	match check_and_announce(ctx.data()).await.map_err(tag_check_error)? {
		CheckOutcome::Completed(report) => {
			let message = format!(
				"✅ Forced rank check. {} advanced, {} ranked up.",
				report.advanced,
				report.promotions.len()
			);
			ctx.reply(&message).await?;
		}
		CheckOutcome::Skipped => {
			ctx.reply_ephemeral("⏳ A rank check is already running.")
				.await?;
		}
	}

	Ok(())
}
// }}}
// {{{ Discord wrapper
/// Forces a rank check to run.
#[poise::command(slash_command)]
pub async fn forcecheck(mut ctx: PoiseContext<'_>) -> Result<(), Error> {
	ctx.defer().await?;
	let res = forcecheck_impl(&mut ctx).await;
	ctx.handle_error(res).await?;
	Ok(())
}
// }}}
// }}}
// {{{ Refresh group
// {{{ Implementation
async fn refreshgroup_impl<C: MessageContext>(ctx: &mut C) -> Result<(), TaggedError> {
	let data = ctx.data();
	let outcome = data
		.source
		.refresh_group(data.group_id(), &data.config.wiseoldman.group_passcode)
		.await;

	ctx.reply(&outcome.to_string()).await?;
	Ok(())
}
// }}}
// {{{ Discord wrapper
/// Forces a full update for the group's data.
#[poise::command(slash_command)]
pub async fn refreshgroup(mut ctx: PoiseContext<'_>) -> Result<(), Error> {
	ctx.defer().await?;
	let res = refreshgroup_impl(&mut ctx).await;
	ctx.handle_error(res).await?;
	Ok(())
}
// }}}
// }}}
// {{{ Debug group
// {{{ Implementation
async fn debug_group_impl<C: MessageContext>(ctx: &mut C) -> Result<(), TaggedError> {
	let data = ctx.data();
	let group = data
		.source
		.fetch_group(data.group_id())
		.await
		.map_err(|e| anyhow!("Failed to fetch group details: {e}").tag(ErrorKind::User))?;

	tracing::debug!(?group, "Fetched group for inspection");

	let message = format!(
		"Group Name: {}\nMembers: {}",
		group.name,
		group.members.len()
	);
	ctx.reply(&message).await?;

	Ok(())
}
// }}}
// {{{ Discord wrapper
/// Debugs and inspects group response.
#[poise::command(slash_command)]
pub async fn debug_group(mut ctx: PoiseContext<'_>) -> Result<(), Error> {
	let res = debug_group_impl(&mut ctx).await;
	ctx.handle_error(res).await?;
	Ok(())
}
// }}}
