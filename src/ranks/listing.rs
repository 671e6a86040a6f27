//! The group-wide ranking table posted on startup and by `/refresh`.

// {{{ Imports
use chrono::NaiveDateTime;
use tracing::warn;

use crate::ranks::member::round_ehb;
use crate::ranks::tier::RankTable;
use crate::wom::GroupSnapshot;
// }}}

/// Discord refuses messages longer than this many characters.
pub const MESSAGE_LIMIT: usize = 2000;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedMember {
	pub identity: String,
	pub rank: String,
	pub ehb: f64,
}

/// Classifies every well-formed member of a live fetch, highest EHB first.
pub fn rank_members(group: &GroupSnapshot, ranks: &RankTable) -> Vec<RankedMember> {
	let mut members: Vec<_> = group
		.members
		.iter()
		.filter_map(|member| match member {
			Ok(metric) => {
				let ehb = round_ehb(metric.ehb);
				Some(RankedMember {
					identity: metric.identity.clone(),
					rank: ranks.classify(ehb).to_owned(),
					ehb,
				})
			}
			Err(malformed) => {
				warn!(
					member = malformed.identity.as_deref().unwrap_or("Unknown"),
					"Error processing player data: {}",
					malformed.reason
				);
				None
			}
		})
		.collect();

	members.sort_by(|a, b| b.ehb.total_cmp(&a.ehb));
	members
}

fn chunk_len(chunk: &[String]) -> usize {
	chunk.iter().map(|line| line.chars().count() + 1).sum()
}

/// Renders the ranking as fixed-width code blocks, split so that no
/// message goes over [MESSAGE_LIMIT].
pub fn render_listing(
	group_name: &str,
	at: NaiveDateTime,
	members: &[RankedMember],
) -> Vec<String> {
	let mut messages = Vec::new();
	let mut chunk = vec![
		format!(
			"**{group_name} Ranking on {}**\n",
			at.format("%Y-%m-%d %H:%M")
		),
		"```".to_owned(),
		format!("{:<4}{:<20}{:<15}{:<10}", "#", "Player", "Rank", "EHB"),
		"-".repeat(50),
	];

	for (index, member) in members.iter().enumerate() {
		let line = format!(
			"{:<4}{:<20}{:<15}{:<10}",
			index + 1,
			member.identity,
			member.rank,
			member.ehb
		);

		// Room for the line itself plus the closing fence.
		if chunk_len(&chunk) + line.chars().count() + 5 > MESSAGE_LIMIT {
			chunk.push("```".to_owned());
			messages.push(chunk.join("\n"));
			chunk = vec!["```".to_owned()];
		}

		chunk.push(line);
	}

	if chunk.len() > 1 {
		chunk.push("```".to_owned());
		messages.push(chunk.join("\n"));
	}

	messages
}

// }}}
