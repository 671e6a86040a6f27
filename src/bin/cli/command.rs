#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Command,
}

#[derive(clap::Args)]
pub struct MemberArgs {
	/// Wise Old Man username
	pub username: String,
}

#[derive(clap::Subcommand)]
pub enum Command {
	/// Runs a single rank check, printing any rank-ups
	Check,
	/// Prints the group ranking
	List,
	/// Shows the stored rank and EHB of a member
	Lookup(MemberArgs),
	/// Shows a member's current and next rank
	Rankup(MemberArgs),
	/// Overwrites a member's stored EHB with live data
	Update(MemberArgs),
	/// Prints the configured rank bands and how many members hold each
	Ranks,
	/// Prints logged EHB history
	History(crate::commands::history::Args),
}
