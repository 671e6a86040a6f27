//! Wise Old Man access: the [MetricSource] seam the checker fetches group
//! members through, plus the HTTP client implementing it.

// {{{ Imports
use std::fmt::{self, Display};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::WomConfig;
// }}}

// {{{ Seam
/// A member's current EHB, as reported by the metric source.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberMetric {
	pub identity: String,
	pub ehb: f64,
}

/// A membership entry which could not be turned into a [MemberMetric].
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedMember {
	pub identity: Option<String>,
	pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSnapshot {
	pub name: String,
	pub members: Vec<Result<MemberMetric, MalformedMember>>,
}

impl GroupSnapshot {
	pub fn well_formed(&self) -> impl Iterator<Item = &MemberMetric> {
		self.members.iter().filter_map(|m| m.as_ref().ok())
	}
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
	#[error("request to Wise Old Man failed: {0}")]
	Transport(#[from] reqwest::Error),
	#[error("Wise Old Man returned {status}: {message}")]
	Api { status: u16, message: String },
	#[error("could not decode the group response: {0}")]
	Decode(String),
	#[error("Wise Old Man did not answer within {}s", .0.as_secs())]
	TimedOut(Duration),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
	Updated(u64),
	NothingToUpdate,
	Failed(String),
}

impl Display for RefreshOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Updated(count) => write!(
				f,
				"✅ Successfully refreshed group data. {count} members updated."
			),
			Self::NothingToUpdate => write!(f, "ℹ️ The API reported 'Nothing to update'."),
			Self::Failed(message) => write!(f, "❌ Failed to refresh group: {message}"),
		}
	}
}

#[async_trait]
pub trait MetricSource: Send + Sync {
	/// Fetches the group's members together with their EHB. An `Err` means
	/// the fetch itself failed; an empty member list is a valid answer.
	async fn fetch_group(&self, group_id: u64) -> Result<GroupSnapshot, FetchError>;

	/// Asks the source to re-sync every member of the group.
	async fn refresh_group(&self, group_id: u64, passcode: &str) -> RefreshOutcome;
}
// }}}
// {{{ Response decoding
#[derive(Deserialize)]
struct RawGroup {
	name: String,
	#[serde(default)]
	memberships: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMembership {
	player: RawPlayer,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlayer {
	display_name: String,
	ehb: f64,
}

#[derive(Deserialize)]
struct RawApiError {
	message: String,
}

#[derive(Deserialize)]
struct RawUpdateAll {
	#[serde(default)]
	count: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAllBody<'a> {
	verification_code: &'a str,
}

fn parse_membership(value: Value) -> Result<MemberMetric, MalformedMember> {
	let identity = value
		.pointer("/player/displayName")
		.and_then(Value::as_str)
		.map(str::to_owned);

	serde_json::from_value::<RawMembership>(value)
		.map(|raw| MemberMetric {
			identity: raw.player.display_name,
			ehb: raw.player.ehb,
		})
		.map_err(|e| MalformedMember {
			identity,
			reason: e.to_string(),
		})
}

/// Decodes a `GET /groups/{id}` body. Broken memberships are kept as
/// [MalformedMember] entries so the rest of the group still gets processed.
pub fn parse_group(body: &str) -> Result<GroupSnapshot, FetchError> {
	let raw: RawGroup =
		serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

	Ok(GroupSnapshot {
		name: raw.name,
		members: raw.memberships.into_iter().map(parse_membership).collect(),
	})
}

fn api_error_message(body: &str) -> String {
	serde_json::from_str::<RawApiError>(body)
		.map(|e| e.message)
		.unwrap_or_else(|_| body.trim().to_owned())
}
// }}}
// {{{ HTTP client
#[derive(Debug, Clone)]
pub struct WomClient {
	http: reqwest::Client,
	base_url: String,
	api_key: Option<String>,
}

impl WomClient {
	pub fn new(config: &WomConfig) -> anyhow::Result<Self> {
		let http = reqwest::Client::builder()
			.user_agent(concat!("ehbwatch/", env!("CARGO_PKG_VERSION")))
			.timeout(config.timeout())
			.build()
			.context("Could not build Wise Old Man http client")?;

		Ok(Self {
			http,
			base_url: config.base_url.trim_end_matches('/').to_owned(),
			api_key: config.api_key.clone(),
		})
	}

	fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
		let builder = self.http.request(method, format!("{}{path}", self.base_url));
		match &self.api_key {
			Some(key) => builder.header("x-api-key", key),
			None => builder,
		}
	}
}

#[async_trait]
impl MetricSource for WomClient {
	async fn fetch_group(&self, group_id: u64) -> Result<GroupSnapshot, FetchError> {
		let response = self
			.request(reqwest::Method::GET, &format!("/groups/{group_id}"))
			.send()
			.await?;

		let status = response.status();
		let body = response.text().await?;

		if !status.is_success() {
			return Err(FetchError::Api {
				status: status.as_u16(),
				message: api_error_message(&body),
			});
		}

		parse_group(&body)
	}

	async fn refresh_group(&self, group_id: u64, passcode: &str) -> RefreshOutcome {
		let response = self
			.request(
				reqwest::Method::POST,
				&format!("/groups/{group_id}/update-all"),
			)
			.json(&UpdateAllBody {
				verification_code: passcode,
			})
			.send()
			.await;

		let response = match response {
			Ok(response) => response,
			Err(e) => return RefreshOutcome::Failed(e.to_string()),
		};

		let status = response.status();
		let body = match response.text().await {
			Ok(body) => body,
			Err(e) => return RefreshOutcome::Failed(e.to_string()),
		};

		refresh_outcome(status, &body)
	}
}

fn refresh_outcome(status: StatusCode, body: &str) -> RefreshOutcome {
	match status {
		StatusCode::OK => RefreshOutcome::Updated(
			serde_json::from_str::<RawUpdateAll>(body)
				.map(|r| r.count)
				.unwrap_or_default(),
		),
		StatusCode::BAD_REQUEST if api_error_message(body) == "Nothing to update." => {
			RefreshOutcome::NothingToUpdate
		}
		_ => RefreshOutcome::Failed(api_error_message(body)),
	}
}
// }}}
