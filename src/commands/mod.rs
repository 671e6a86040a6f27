use crate::context::{Error, PoiseContext, TaggedError, UserContext};

use discord::MessageContext;

pub mod discord;
pub mod fans;
pub mod misc;
pub mod ranks;

/// Every slash command the bot registers.
pub fn all() -> Vec<poise::Command<UserContext, Error>> {
	vec![
		commands(),
		ranks::lookup(),
		ranks::rankup(),
		ranks::update(),
		ranks::refresh(),
		ranks::forcecheck(),
		ranks::refreshgroup(),
		ranks::debug_group(),
		fans::link(),
		fans::subscribeall(),
		fans::unsubscribeall(),
		misc::goodnight(),
		misc::sendrankup_debug(),
		misc::logs(),
	]
}

// {{{ Help
pub const COMMAND_LIST: &[&str] = &[
	"**Usernames with spaces in them need to be enclosed in quotes.**",
	"Usernames are matched case-insensitively by **/lookup**, **/rankup** and **/update**, but not by **/link**",
	"",
	"/refresh ➡️    Refreshes and posts the updated group rankings.",
	"/update 'username' ➡️  Fetches and updates the rank for a specific user.",
	"/rankup 'username' ➡️  Displays the current rank, EHB, and next rank for a given player.",
	"/refreshgroup ➡️   Forces a full update for the group's data.",
	"/link 'username' 'discord_name' ➡️     Links a Discord user to a WiseOldMan username for mentions when ranking up.",
	"/lookup 'username' ➡️  Lists the rank and EHB for a specific user.",
	"/subscribeall 'discord_name' ➡️    Subscribes a Discord user to ALL usernames.",
	"/unsubscribeall 'discord_name' ➡️  Removes a Discord user from ALL linked usernames.",
	"/commands ➡️   Lists all available commands.",
	"/goodnight ➡️  Sends a good night message.",
	"/forcecheck ➡️     Forces a rank check to run.",
	"/sendrankup_debug ➡️   Debugging command to simulate a rank up message.",
	"/debug_group ➡️    Debugs and inspects group response.",
	"/logs ➡️   Shows the most recent log lines.",
];

async fn commands_impl<C: MessageContext>(ctx: &mut C) -> Result<(), TaggedError> {
	let message = format!("**Available Commands:**\n{}", COMMAND_LIST.join("\n"));
	ctx.reply_ephemeral(&message).await?;
	Ok(())
}

/// Lists all available commands.
#[poise::command(slash_command)]
pub async fn commands(mut ctx: PoiseContext<'_>) -> Result<(), Error> {
	let res = commands_impl(&mut ctx).await;
	ctx.handle_error(res).await?;
	Ok(())
}
// }}}
