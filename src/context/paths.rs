//! This module provides helpers for working with environment
//! variables and paths, together with a struct
//! that keeps track of all the runtime-relevant paths.

use anyhow::Context;
use std::{path::Path, path::PathBuf, str::FromStr};

/// Wrapper around [std::env::var] which adds [anyhow] context around errors.
pub fn get_var(name: &str) -> anyhow::Result<String> {
	std::env::var(name).with_context(|| format!("Missing ${name} environment variable"))
}

/// Reads an environment variable containing a directory path,
/// creating the directory if it doesn't exist.
pub fn get_env_dir_path(name: &str, default_to: Option<&str>) -> anyhow::Result<PathBuf> {
	let var = get_var(name);
	let var = match default_to {
		None => var?,
		Some(other) => var.or(get_var(other))?,
	};

	let path = PathBuf::from_str(&var).with_context(|| format!("${name} is not a valid path"))?;
	ensure_dir(&path).with_context(|| format!("Could not create ${name}"))?;

	Ok(path)
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
	if !path.exists() {
		std::fs::create_dir_all(path)?;
	}

	Ok(())
}

#[derive(Clone, Debug)]
pub struct DataPaths {
	/// Holds the rank state and the EHB history.
	data_dir: PathBuf,

	config_path: PathBuf,
	ranks_path: PathBuf,
	history_path: PathBuf,
}

impl DataPaths {
	/// Gets all the standard paths from the environment, creating the data
	/// directory in the process. Without `$EHB_DATA_DIR` or
	/// `$STATE_DIRECTORY`, everything lives in the working directory.
	pub fn new() -> anyhow::Result<Self> {
		let data_dir = match get_env_dir_path("EHB_DATA_DIR", Some("STATE_DIRECTORY")) {
			Ok(path) => path,
			Err(_) if get_var("EHB_DATA_DIR").is_err() && get_var("STATE_DIRECTORY").is_err() => {
				PathBuf::from(".")
			}
			Err(e) => return Err(e),
		};

		let mut paths = Self::in_dir(data_dir);
		let file_var = |name| get_var(name).ok().map(PathBuf::from);

		if let Some(path) = file_var("EHB_CONFIG_PATH") {
			paths.config_path = path;
		}

		if let Some(path) = file_var("EHB_RANKS_PATH") {
			paths.ranks_path = path;
		}

		if let Some(path) = file_var("EHB_LOG_PATH") {
			paths.history_path = path;
		}

		Ok(paths)
	}

	/// Default layout, with every file inside `data_dir`.
	pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
		let data_dir = data_dir.into();
		Self {
			config_path: data_dir.join("config.toml"),
			ranks_path: data_dir.join("ranks.toml"),
			history_path: data_dir.join("ehb_log.csv"),
			data_dir,
		}
	}

	pub fn data_dir(&self) -> &PathBuf {
		&self.data_dir
	}

	pub fn state_path(&self) -> PathBuf {
		self.data_dir.join("player_ranks.json")
	}

	pub fn config_path(&self) -> &PathBuf {
		&self.config_path
	}

	pub fn ranks_path(&self) -> &PathBuf {
		&self.ranks_path
	}

	pub fn history_path(&self) -> &PathBuf {
		&self.history_path
	}
}
