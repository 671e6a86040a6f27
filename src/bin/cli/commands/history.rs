use anyhow::anyhow;
use ehbwatch::commands::discord::MessageContext;
use ehbwatch::context::{ErrorKind, TagError, TaggedError};
use ehbwatch::ranks::history::TIMESTAMP_FORMAT;

use crate::context::CliContext;

#[derive(clap::Args)]
pub struct Args {
	/// Only show entries for this member
	username: Option<String>,

	/// How many entries to show
	#[arg(long, default_value_t = 20)]
	limit: usize,
}

pub fn run(ctx: &CliContext, args: Args) -> Result<(), TaggedError> {
	let history = ctx.data().checker.store().history().ok_or_else(|| {
		anyhow!("No EHB history is configured").tag(ErrorKind::User)
	})?;

	let entries = match &args.username {
		Some(username) => {
			let mut entries = history.history_for(username)?;
			let skip = entries.len().saturating_sub(args.limit);
			entries.drain(..skip);
			entries
		}
		None => {
			let mut entries = history.recent(args.limit)?;
			entries.reverse();
			entries
		}
	};

	if entries.is_empty() {
		println!("No history found.");
	}

	for entry in entries {
		println!(
			"{}  {:<20}{:>10.2}",
			entry.timestamp.format(TIMESTAMP_FORMAT),
			entry.identity,
			entry.ehb
		);
	}

	Ok(())
}
