// {{{ Imports
use anyhow::anyhow;

use crate::context::{Error, ErrorKind, PoiseContext, TagError, TaggedError};
use crate::ranks::member::LinkOutcome;

use super::discord::MessageContext;
use super::ranks::tag_check_error;
// }}}

// {{{ Link
// {{{ Implementation
async fn link_impl<C: MessageContext>(
	ctx: &mut C,
	username: &str,
	discord_name: &str,
) -> Result<(), TaggedError> {
	let outcome = ctx
		.data()
		.checker
		.edit_state(|state| state.link(username, discord_name))
		.await
		.map_err(tag_check_error)?;

	match outcome {
		LinkOutcome::Linked => {
			tracing::info!(member = %username, fan = %discord_name, "Linked fan");
			ctx.reply(&format!("✅ Linked {discord_name} to {username} :)"))
				.await?;
		}
		LinkOutcome::AlreadyLinked => {
			ctx.reply_ephemeral(&format!(
				"⚠️ {discord_name} is already linked to {username}."
			))
			.await?;
		}
		LinkOutcome::UnknownMember => {
			return Err(
				anyhow!("❌ Username '{username}' not found in the ranks data.")
					.tag(ErrorKind::User),
			);
		}
	}

	Ok(())
}
// }}}
// {{{ Discord wrapper
/// Links a Discord user to a WiseOldMan username for mentions when ranking up.
#[poise::command(slash_command)]
pub async fn link(
	mut ctx: PoiseContext<'_>,
	#[description = "Wise Old Man username"] username: String,
	#[description = "Discord user to link"] discord_name: String,
) -> Result<(), Error> {
	let res = link_impl(&mut ctx, &username, &discord_name).await;
	ctx.handle_error(res).await?;
	Ok(())
}
// }}}
// }}}
// {{{ Subscribe all
// {{{ Implementation
async fn subscribeall_impl<C: MessageContext>(
	ctx: &mut C,
	discord_name: &str,
) -> Result<(), TaggedError> {
	let count = ctx
		.data()
		.checker
		.edit_state(|state| state.subscribe_all(discord_name))
		.await
		.map_err(tag_check_error)?;

	if count > 0 {
		ctx.reply(&format!(
			"✅ **{discord_name}** has been subscribed to **{count}** players."
		))
		.await?;
	} else {
		ctx.reply_ephemeral(&format!(
			"⚠️ **{discord_name}** is already subscribed to all players."
		))
		.await?;
	}

	Ok(())
}
// }}}
// {{{ Discord wrapper
/// Subscribes a Discord user to every tracked player.
#[poise::command(slash_command)]
pub async fn subscribeall(
	mut ctx: PoiseContext<'_>,
	#[description = "Discord user to subscribe"] discord_name: String,
) -> Result<(), Error> {
	let res = subscribeall_impl(&mut ctx, &discord_name).await;
	ctx.handle_error(res).await?;
	Ok(())
}
// }}}
// }}}
// {{{ Unsubscribe all
// {{{ Implementation
async fn unsubscribeall_impl<C: MessageContext>(
	ctx: &mut C,
	discord_name: &str,
) -> Result<(), TaggedError> {
	let count = ctx
		.data()
		.checker
		.edit_state(|state| state.unsubscribe_all(discord_name))
		.await
		.map_err(tag_check_error)?;

	if count > 0 {
		ctx.reply(&format!(
			"✅ **{discord_name}** has been unsubscribed from **{count}** users."
		))
		.await?;
	} else {
		ctx.reply_ephemeral(&format!(
			"⚠️ **{discord_name}** was not found in any subscriptions."
		))
		.await?;
	}

	Ok(())
}
// }}}
// {{{ Discord wrapper
/// Removes a Discord user from all linked usernames.
#[poise::command(slash_command)]
pub async fn unsubscribeall(
	mut ctx: PoiseContext<'_>,
	#[description = "Discord user to unsubscribe"] discord_name: String,
) -> Result<(), Error> {
	let res = unsubscribeall_impl(&mut ctx, &discord_name).await;
	ctx.handle_error(res).await?;
	Ok(())
}
// }}}
