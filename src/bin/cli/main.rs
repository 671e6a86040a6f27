use clap::Parser;
use command::{Cli, Command};
use ehbwatch::commands::ranks::{
	forcecheck_impl, lookup_impl, rankup_impl, refresh_impl, update_impl,
};
use ehbwatch::commands::discord::MessageContext;
use ehbwatch::context::Error;

mod command;
mod commands;
mod context;

#[tokio::main]
async fn main() -> Result<(), Error> {
	let cli = Cli::parse();
	let mut ctx = commands::create_context()?;

	let res = match cli.command {
		Command::Check => forcecheck_impl(&mut ctx).await,
		Command::List => refresh_impl(&mut ctx).await,
		Command::Lookup(args) => lookup_impl(&mut ctx, &args.username).await,
		Command::Rankup(args) => rankup_impl(&mut ctx, &args.username).await,
		Command::Update(args) => update_impl(&mut ctx, &args.username).await,
		Command::Ranks => commands::ranks::run(&ctx),
		Command::History(args) => commands::history::run(&ctx, args),
	};

	ctx.handle_error(res).await?;
	Ok(())
}
