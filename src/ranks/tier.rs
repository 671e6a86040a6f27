//! Rank rules map an EHB value onto a named tier.
//!
//! Rules are written as `"<lower>-<upper>" = "<label>"` for a closed band
//! (lower inclusive, upper exclusive) or `"<lower>+" = "<label>"` for the
//! open-ended top band. Classification walks the rules in the order they
//! were declared and returns the first band that matches, so declaration
//! order decides precedence. Validation at load time guarantees the bands
//! tile the number line without gaps or overlaps, which makes that order
//! irrelevant for any configuration that actually loads.

// {{{ Imports
use std::fmt::{self, Display};
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use tracing::warn;
// }}}

/// Label assigned when no configured band matches a value.
pub const UNKNOWN_RANK: &str = "Unknown";

// {{{ Tier rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpperBound {
	Exclusive(f64),
	Open,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TierRule {
	pub lower: f64,
	pub upper: UpperBound,
	pub label: String,
}

fn parse_bound(raw: &str, key: &str) -> anyhow::Result<f64> {
	let value: f64 = raw
		.trim()
		.parse()
		.with_context(|| format!("Rank range `{key}` has an invalid bound `{raw}`"))?;

	if !value.is_finite() || value < 0.0 {
		bail!("Rank range `{key}` must use finite, non-negative bounds");
	}

	Ok(value)
}

impl TierRule {
	/// Parses a single `"<lower>-<upper>"` or `"<lower>+"` key.
	pub fn parse(key: &str, label: &str) -> anyhow::Result<Self> {
		let key = key.trim();
		let label = label.trim();

		if label.is_empty() {
			bail!("Rank range `{key}` has an empty label");
		}

		if label == UNKNOWN_RANK {
			bail!("Rank range `{key}` uses the reserved label `{UNKNOWN_RANK}`");
		}

		let (lower, upper) = if let Some(lower) = key.strip_suffix('+') {
			(parse_bound(lower, key)?, UpperBound::Open)
		} else {
			let (lower, upper) = key.split_once('-').ok_or_else(|| {
				anyhow!("Rank range `{key}` must look like `<lower>-<upper>` or `<lower>+`")
			})?;

			let lower = parse_bound(lower, key)?;
			let upper = parse_bound(upper, key)?;
			if lower >= upper {
				bail!("Rank range `{key}` must have a lower bound below its upper bound");
			}

			(lower, UpperBound::Exclusive(upper))
		};

		Ok(Self {
			lower,
			upper,
			label: label.to_owned(),
		})
	}

	#[inline]
	pub fn matches(&self, ehb: f64) -> bool {
		match self.upper {
			UpperBound::Open => ehb >= self.lower,
			UpperBound::Exclusive(upper) => self.lower <= ehb && ehb < upper,
		}
	}
}

impl Display for TierRule {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.upper {
			UpperBound::Open => write!(f, "{}+ = {}", self.lower, self.label),
			UpperBound::Exclusive(upper) => write!(f, "{}-{} = {}", self.lower, upper, self.label),
		}
	}
}
// }}}
// {{{ Classification
/// Returns the label of the first rule (in iteration order) matching `ehb`,
/// or [UNKNOWN_RANK] when none does. Never fails.
pub fn classify(ehb: f64, rules: &[TierRule]) -> &str {
	rules
		.iter()
		.find(|rule| rule.matches(ehb))
		.map_or(UNKNOWN_RANK, |rule| rule.label.as_str())
}
// }}}
// {{{ Next rank
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NextRank<'a> {
	Next { label: &'a str, threshold: f64 },
	Max,
	/// The given label isn't part of the configured ranks.
	Unknown,
}

impl Display for NextRank<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Next { label, threshold } => write!(f, "{label} at {threshold} EHB"),
			Self::Max => write!(f, "Max Rank Achieved 👑"),
			Self::Unknown => write!(f, "{UNKNOWN_RANK}"),
		}
	}
}
// }}}
// {{{ Rank table
#[derive(Deserialize)]
struct RanksFile {
	group_ranking: toml::Table,
}

/// A validated, non-empty list of tier rules in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct RankTable {
	rules: Vec<TierRule>,
}

impl RankTable {
	pub fn from_pairs<'a>(
		pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
	) -> anyhow::Result<Self> {
		let rules = pairs
			.into_iter()
			.map(|(key, label)| TierRule::parse(key, label))
			.collect::<anyhow::Result<Vec<_>>>()?;

		Self::from_rules(rules)
	}

	pub fn from_rules(rules: Vec<TierRule>) -> anyhow::Result<Self> {
		validate(&rules)?;
		Ok(Self { rules })
	}

	/// Reads the `[group_ranking]` table of a TOML document.
	pub fn from_toml_str(source: &str) -> anyhow::Result<Self> {
		let file: RanksFile = toml::from_str(source).context("Could not parse ranks file")?;

		let mut pairs = Vec::with_capacity(file.group_ranking.len());
		for (key, value) in &file.group_ranking {
			let label = value
				.as_str()
				.ok_or_else(|| anyhow!("Rank range `{key}` must map to a string label"))?;
			pairs.push((key.as_str(), label));
		}

		Self::from_pairs(pairs)
	}

	pub fn load(path: &Path) -> anyhow::Result<Self> {
		let source = std::fs::read_to_string(path)
			.with_context(|| format!("Could not read ranks file at {path:?}"))?;
		Self::from_toml_str(&source).with_context(|| format!("Invalid ranks file at {path:?}"))
	}

	#[inline]
	pub fn rules(&self) -> &[TierRule] {
		&self.rules
	}

	#[inline]
	pub fn classify(&self, ehb: f64) -> &str {
		classify(ehb, &self.rules)
	}

	/// Rules ordered by their lower bound.
	pub fn sorted(&self) -> Vec<&TierRule> {
		let mut sorted: Vec<_> = self.rules.iter().collect();
		sorted.sort_by(|a, b| a.lower.total_cmp(&b.lower));
		sorted
	}

	/// Finds the band following `current` once bands are sorted by threshold.
	/// Members still at [UNKNOWN_RANK] are pointed at the lowest band.
	pub fn next_rank(&self, current: &str) -> NextRank<'_> {
		let sorted = self.sorted();

		if current == UNKNOWN_RANK {
			return sorted.first().map_or(NextRank::Max, |rule| NextRank::Next {
				label: &rule.label,
				threshold: rule.lower,
			});
		}

		let Some(index) = sorted.iter().position(|rule| rule.label == current) else {
			return NextRank::Unknown;
		};

		match sorted.get(index + 1) {
			Some(rule) => NextRank::Next {
				label: &rule.label,
				threshold: rule.lower,
			},
			None => NextRank::Max,
		}
	}
}
// }}}
// {{{ Validation
fn validate(rules: &[TierRule]) -> anyhow::Result<()> {
	if rules.is_empty() {
		bail!("No rank ranges configured");
	}

	let mut sorted: Vec<_> = rules.iter().collect();
	sorted.sort_by(|a, b| a.lower.total_cmp(&b.lower));

	for pair in sorted.windows(2) {
		let (current, next) = (pair[0], pair[1]);
		match current.upper {
			UpperBound::Open => bail!(
				"Open-ended rank `{}` must be the highest band, but `{}` starts above it",
				current.label,
				next.label
			),
			UpperBound::Exclusive(upper) if upper > next.lower => bail!(
				"Rank bands `{}` and `{}` overlap",
				current.label,
				next.label
			),
			UpperBound::Exclusive(upper) if upper < next.lower => bail!(
				"There is a gap between rank bands `{}` and `{}` ({upper}..{})",
				current.label,
				next.label,
				next.lower
			),
			UpperBound::Exclusive(_) => {}
		}
	}

	for (i, rule) in rules.iter().enumerate() {
		if rules[..i].iter().any(|other| other.label == rule.label) {
			warn!(
				label = %rule.label,
				"Rank label is used by more than one band; crossing between them won't be announced"
			);
		}
	}

	Ok(())
}
// }}}
