use ehbwatch::commands::discord::MessageContext;
use ehbwatch::context::TaggedError;
use ehbwatch::ranks::tier::UNKNOWN_RANK;

use crate::context::CliContext;

pub fn run(ctx: &CliContext) -> Result<(), TaggedError> {
	let data = ctx.data();
	let state = data.checker.store().load()?.state;
	let counts = state.distribution();

	println!("{:<40}{:>8}", "Band", "Members");
	for rule in data.ranks.sorted() {
		let count = counts.get(rule.label.as_str()).copied().unwrap_or_default();
		println!("{:<40}{:>8}", rule.to_string(), count);
	}

	if let Some(unknown) = counts.get(UNKNOWN_RANK) {
		println!("{:<40}{:>8}", UNKNOWN_RANK, unknown);
	}

	println!("\n{} members tracked", state.len());
	Ok(())
}
