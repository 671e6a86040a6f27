//! The persisted per-member record and the state map built out of them.

// {{{ Imports
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::ranks::tier::UNKNOWN_RANK;
// }}}

/// Rounds an EHB value to the two decimals the state file keeps.
#[inline]
pub fn round_ehb(value: f64) -> f64 {
	(value * 100.0).round() / 100.0
}

// {{{ Member record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
	#[serde(default)]
	pub last_ehb: f64,

	#[serde(default = "unknown_rank")]
	pub rank: String,

	/// Discord identities pinged when this member ranks up.
	#[serde(
		rename = "discord_name",
		default,
		deserialize_with = "one_or_many"
	)]
	pub subscribers: Vec<String>,
}

fn unknown_rank() -> String {
	UNKNOWN_RANK.to_owned()
}

impl Default for MemberRecord {
	fn default() -> Self {
		Self {
			last_ehb: 0.0,
			rank: unknown_rank(),
			subscribers: Vec::new(),
		}
	}
}

/// Older state files stored a single fan as a bare string.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum OneOrMany {
		One(String),
		Many(Vec<String>),
	}

	Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
		None => Vec::new(),
		Some(OneOrMany::One(name)) if name.is_empty() => Vec::new(),
		Some(OneOrMany::One(name)) => vec![name],
		Some(OneOrMany::Many(names)) => names,
	})
}
// }}}
// {{{ Rank state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
	Linked,
	AlreadyLinked,
	UnknownMember,
}

/// Every tracked member, keyed by their Wise Old Man display name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankState {
	members: BTreeMap<String, MemberRecord>,
}

impl RankState {
	#[inline]
	pub fn len(&self) -> usize {
		self.members.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.members.is_empty()
	}

	#[inline]
	pub fn get(&self, identity: &str) -> Option<&MemberRecord> {
		self.members.get(identity)
	}

	/// Returns the record for `identity`, creating a default one if it's new.
	#[inline]
	pub fn entry(&mut self, identity: &str) -> &mut MemberRecord {
		self.members.entry(identity.to_owned()).or_default()
	}

	#[inline]
	pub fn insert(&mut self, identity: String, record: MemberRecord) -> Option<MemberRecord> {
		self.members.insert(identity, record)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &MemberRecord)> {
		self.members.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Looks a member up by exact name first, then case-insensitively.
	pub fn find(&self, name: &str) -> Option<(&str, &MemberRecord)> {
		if let Some((identity, record)) = self.members.get_key_value(name) {
			return Some((identity, record));
		}

		let lowered = name.to_lowercase();
		self.iter()
			.find(|(identity, _)| identity.to_lowercase() == lowered)
	}

	/// Members ordered by EHB, highest first.
	pub fn by_ehb(&self) -> Vec<(&str, &MemberRecord)> {
		let mut members: Vec<_> = self.iter().collect();
		members.sort_by(|a, b| b.1.last_ehb.total_cmp(&a.1.last_ehb));
		members
	}

	/// How many members currently hold each rank.
	pub fn distribution(&self) -> BTreeMap<&str, usize> {
		let mut counts = BTreeMap::new();
		for record in self.members.values() {
			*counts.entry(record.rank.as_str()).or_default() += 1;
		}
		counts
	}

	// {{{ Subscribers
	pub fn link(&mut self, identity: &str, fan: &str) -> LinkOutcome {
		let Some(record) = self.members.get_mut(identity) else {
			return LinkOutcome::UnknownMember;
		};

		if record.subscribers.iter().any(|s| s == fan) {
			LinkOutcome::AlreadyLinked
		} else {
			record.subscribers.push(fan.to_owned());
			LinkOutcome::Linked
		}
	}

	/// Adds `fan` to every member lacking it, returning how many were changed.
	pub fn subscribe_all(&mut self, fan: &str) -> usize {
		let mut count = 0;
		for record in self.members.values_mut() {
			if !record.subscribers.iter().any(|s| s == fan) {
				record.subscribers.push(fan.to_owned());
				count += 1;
			}
		}
		count
	}

	/// Removes `fan` from every member holding it, returning how many were changed.
	pub fn unsubscribe_all(&mut self, fan: &str) -> usize {
		let mut count = 0;
		for record in self.members.values_mut() {
			let before = record.subscribers.len();
			record.subscribers.retain(|s| s != fan);
			if record.subscribers.len() != before {
				count += 1;
			}
		}
		count
	}
	// }}}
}
// }}}
