// {{{ Imports
use anyhow::anyhow;

use crate::context::{Error, ErrorKind, PoiseContext, TagError, TaggedError};
use crate::ranks::checker::PromotionEvent;

use super::discord::MessageContext;
// }}}

// {{{ Goodnight
async fn goodnight_impl<C: MessageContext>(ctx: &mut C) -> Result<(), TaggedError> {
	ctx.reply("Good night, king 👑").await?;
	Ok(())
}

/// Sends a good night message.
#[poise::command(slash_command)]
pub async fn goodnight(mut ctx: PoiseContext<'_>) -> Result<(), Error> {
	let res = goodnight_impl(&mut ctx).await;
	ctx.handle_error(res).await?;
	Ok(())
}
// }}}
// {{{ Rank-up debug
// {{{ Implementation
/// The fake promotion announced by `/sendrankup_debug`.
pub fn debug_promotion() -> PromotionEvent {
	PromotionEvent {
		identity: "Zezima".to_owned(),
		old_rank: "Hero".to_owned(),
		new_rank: "Legend".to_owned(),
		ehb: 1_000_000_000.0,
		subscribers: Vec::new(),
	}
}

async fn sendrankup_debug_impl<C: MessageContext>(ctx: &mut C) -> Result<(), TaggedError> {
	ctx.data()
		.notifier
		.notify(&debug_promotion())
		.await
		.map_err(|e| {
			anyhow!("❌ Error sending a rank up message to the channel: {e:#}")
				.tag(ErrorKind::User)
		})?;

	ctx.reply("✅ Successfully sent a rank up message to the channel.")
		.await?;
	Ok(())
}
// }}}
// {{{ Discord wrapper
/// Debug command to simulate a rank up message.
#[poise::command(slash_command)]
pub async fn sendrankup_debug(mut ctx: PoiseContext<'_>) -> Result<(), Error> {
	let res = sendrankup_debug_impl(&mut ctx).await;
	ctx.handle_error(res).await?;
	Ok(())
}
// }}}
// }}}
// {{{ Logs
// {{{ Implementation
/// Discord caps messages at 2000 characters, so leave room for the fences.
const LOG_REPLY_BUDGET: usize = 1900;

async fn logs_impl<C: MessageContext>(ctx: &mut C, lines: usize) -> Result<(), TaggedError> {
	let tail = ctx.data().log_feed.tail();
	if tail.is_empty() {
		ctx.reply_ephemeral("Nothing has been logged yet.").await?;
		return Ok(());
	}

	// Newest lines win when the budget runs out.
	let mut picked = Vec::new();
	let mut used = 0;
	for line in tail.iter().rev().take(lines.max(1)) {
		let len = line.chars().count() + 1;
		if used + len > LOG_REPLY_BUDGET {
			break;
		}
		used += len;
		picked.push(line.as_str());
	}
	picked.reverse();

	ctx.reply_ephemeral(&format!("```\n{}\n```", picked.join("\n")))
		.await?;
	Ok(())
}
// }}}
// {{{ Discord wrapper
/// Shows the bot's most recent log lines.
#[poise::command(slash_command)]
pub async fn logs(
	mut ctx: PoiseContext<'_>,
	#[description = "How many lines to show (default 20)"] lines: Option<usize>,
) -> Result<(), Error> {
	let res = logs_impl(&mut ctx, lines.unwrap_or(20)).await;
	ctx.handle_error(res).await?;
	Ok(())
}
// }}}
