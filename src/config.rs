//! Bot configuration, read once at startup from `config.toml` and then
//! layered with a handful of environment overrides.

// {{{ Imports
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
// }}}

pub const DEFAULT_WOM_URL: &str = "https://api.wiseoldman.net/v2";
pub const DEFAULT_BASEROW_URL: &str = "https://api.baserow.io/api/database/rows/table";

// {{{ Sections
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscordConfig {
	#[serde(default)]
	pub token: String,

	/// Where rank-ups and listings get posted.
	#[serde(default)]
	pub channel_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WomConfig {
	pub group_id: u64,

	#[serde(default)]
	pub group_passcode: String,

	#[serde(default)]
	pub api_key: Option<String>,

	#[serde(default = "default_wom_url")]
	pub base_url: String,

	/// Seconds a single request may take before it is abandoned.
	#[serde(default = "default_timeout_secs")]
	pub timeout_secs: u64,
}

impl WomConfig {
	#[inline]
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs)
	}
}

impl Default for WomConfig {
	fn default() -> Self {
		Self {
			group_id: 0,
			group_passcode: String::new(),
			api_key: None,
			base_url: default_wom_url(),
			timeout_secs: default_timeout_secs(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// Seconds between rank checks.
	pub check_interval: u64,
	pub run_at_startup: bool,
	pub print_to_csv: bool,
	pub print_csv_changes: bool,
	pub post_to_discord: bool,
	pub silent: bool,
	pub debug: bool,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			check_interval: 300,
			run_at_startup: true,
			print_to_csv: true,
			print_csv_changes: true,
			post_to_discord: true,
			silent: false,
			debug: false,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaserowConfig {
	#[serde(default)]
	pub token: Option<String>,

	#[serde(default = "default_players_table")]
	pub players_table_id: u64,

	#[serde(default = "default_baserow_url")]
	pub base_url: String,

	#[serde(default = "default_timeout_secs")]
	pub timeout_secs: u64,
}

impl BaserowConfig {
	#[inline]
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs)
	}
}

impl Default for BaserowConfig {
	fn default() -> Self {
		Self {
			token: None,
			players_table_id: default_players_table(),
			base_url: default_baserow_url(),
			timeout_secs: default_timeout_secs(),
		}
	}
}

fn default_wom_url() -> String {
	DEFAULT_WOM_URL.to_owned()
}

fn default_baserow_url() -> String {
	DEFAULT_BASEROW_URL.to_owned()
}

fn default_players_table() -> u64 {
	613980
}

fn default_timeout_secs() -> u64 {
	30
}
// }}}
// {{{ BotConfig
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotConfig {
	#[serde(default)]
	pub discord: DiscordConfig,
	pub wiseoldman: WomConfig,
	#[serde(default)]
	pub settings: Settings,
	#[serde(default)]
	pub baserow: BaserowConfig,
}

impl BotConfig {
	pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
		let config: Self = toml::from_str(contents).context("Invalid config file")?;
		config.validate()?;
		Ok(config)
	}

	/// Reads the config at `path`, then applies the `EHB_*` environment
	/// overrides on top.
	pub fn load(path: &Path) -> anyhow::Result<Self> {
		let contents = std::fs::read_to_string(path)
			.with_context(|| format!("Could not read config at {path:?}"))?;
		let mut config = Self::from_toml_str(&contents)
			.with_context(|| format!("Could not load config at {path:?}"))?;
		config.apply_overrides(|name| std::env::var(name).ok());
		Ok(config)
	}

	/// Secrets may come from the environment instead of the file.
	pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
		let lookup = |name: &str| lookup(name).filter(|value| !value.is_empty());

		if let Some(token) = lookup("EHB_DISCORD_TOKEN") {
			self.discord.token = token;
		}

		if let Some(key) = lookup("EHB_WOM_API_KEY") {
			self.wiseoldman.api_key = Some(key);
		}

		if let Some(token) = lookup("EHB_BASEROW_TOKEN") {
			self.baserow.token = Some(token);
		}
	}

	pub fn validate(&self) -> anyhow::Result<()> {
		if self.wiseoldman.group_id == 0 {
			bail!("[wiseoldman] group_id must be set");
		}

		if self.settings.check_interval == 0 {
			bail!("[settings] check_interval must be at least one second");
		}

		if self.wiseoldman.timeout_secs == 0 || self.baserow.timeout_secs == 0 {
			bail!("Request timeouts must be at least one second");
		}

		if self.settings.post_to_discord && self.discord.channel_id == 0 {
			bail!("[discord] channel_id must be set when post_to_discord is enabled");
		}

		Ok(())
	}

	/// Only the bot needs this, so it is checked on demand rather than in
	/// [Self::validate].
	pub fn discord_token(&self) -> anyhow::Result<&str> {
		if self.discord.token.is_empty() {
			Err(anyhow!(
				"Missing discord token (set [discord] token or $EHB_DISCORD_TOKEN)"
			))
		} else {
			Ok(&self.discord.token)
		}
	}
}
// }}}
