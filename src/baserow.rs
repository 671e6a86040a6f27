//! Mirrors member ranks into a Baserow players table.

// {{{ Imports
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::BaserowConfig;
use crate::ranks::member::MemberRecord;
use crate::ranks::store::TableSync;
// }}}

// {{{ Wire types
#[derive(Serialize, Debug, PartialEq)]
struct PlayerRow<'a> {
	#[serde(rename = "Username")]
	username: &'a str,
	#[serde(rename = "Rank")]
	rank: &'a str,
	last_ehb: f64,
	/// Fans, comma separated.
	discord_name: String,
}

impl<'a> PlayerRow<'a> {
	fn new(identity: &'a str, record: &'a MemberRecord) -> Self {
		Self {
			username: identity,
			rank: &record.rank,
			last_ehb: record.last_ehb,
			discord_name: record.subscribers.join(", "),
		}
	}
}

#[derive(Deserialize)]
struct RowId {
	id: u64,
}

#[derive(Deserialize)]
struct RowList {
	results: Vec<RowId>,
}
// }}}
// {{{ Client
pub struct BaserowSync {
	http: reqwest::Client,
	table_url: String,
	token: String,
}

impl BaserowSync {
	/// Returns `None` when no token is configured.
	pub fn from_config(config: &BaserowConfig) -> anyhow::Result<Option<Self>> {
		let Some(token) = config.token.as_ref().filter(|t| !t.is_empty()) else {
			return Ok(None);
		};

		let http = reqwest::Client::builder()
			.timeout(config.timeout())
			.build()
			.context("Could not build Baserow http client")?;

		Ok(Some(Self {
			http,
			table_url: format!(
				"{}/{}/",
				config.base_url.trim_end_matches('/'),
				config.players_table_id
			),
			token: token.clone(),
		}))
	}

	fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
		self.http
			.request(method, url)
			.header("Authorization", format!("Token {}", self.token))
			.query(&[("user_field_names", "true")])
	}

	async fn find_row(&self, identity: &str) -> anyhow::Result<Option<u64>> {
		let rows = self
			.request(reqwest::Method::GET, self.table_url.clone())
			.query(&[("filter__Username__equal", identity)])
			.send()
			.await
			.context("Failed to send request")?
			.error_for_status()
			.context("Error fetching player row")?
			.json::<RowList>()
			.await
			.context("Failed to decode response")?;

		Ok(rows.results.first().map(|row| row.id))
	}
}

#[async_trait]
impl TableSync for BaserowSync {
	async fn upsert(&self, identity: &str, record: &MemberRecord) -> anyhow::Result<()> {
		let row = PlayerRow::new(identity, record);

		let (request, action) = match self.find_row(identity).await? {
			Some(id) => (
				self.request(reqwest::Method::PATCH, format!("{}{id}/", self.table_url)),
				"updating",
			),
			None => (
				self.request(reqwest::Method::POST, self.table_url.clone()),
				"creating",
			),
		};

		let response = request
			.json(&row)
			.send()
			.await
			.context("Failed to send request")?;

		if !response.status().is_success() {
			return Err(anyhow!(
				"Error {action} player row: {}",
				response.status()
			));
		}

		info!(
			member = %identity,
			rank = %record.rank,
			ehb = record.last_ehb,
			"Finished {action} player in Baserow players table"
		);

		Ok(())
	}
}
// }}}
