// {{{ Imports
use std::sync::Arc;

use crate::config::BotConfig;
use crate::context::paths::DataPaths;
use crate::logs::LogListeners;
use crate::ranks::checker::RankChecker;
use crate::ranks::history::HistoryLog;
use crate::ranks::notify::Notifier;
use crate::ranks::store::{StateStore, TableSync};
use crate::ranks::tier::RankTable;
use crate::timed;
use crate::wom::MetricSource;
// }}}

pub mod paths;

// {{{ Common types
pub type Error = anyhow::Error;
pub type PoiseContext<'a> = poise::Context<'a, UserContext, Error>;
// }}}
// {{{ Error handling
#[derive(Debug, Clone, Copy)]
pub enum ErrorKind {
	User,
	Internal,
}

#[derive(Debug)]
pub struct TaggedError {
	pub kind: ErrorKind,
	pub error: Error,
}

impl TaggedError {
	#[inline]
	pub fn new(kind: ErrorKind, error: Error) -> Self {
		Self { kind, error }
	}
}

impl<E: Into<Error>> From<E> for TaggedError {
	fn from(value: E) -> Self {
		Self::new(ErrorKind::Internal, value.into())
	}
}

pub trait TagError {
	fn tag(self, tag: ErrorKind) -> TaggedError;
}

impl TagError for Error {
	fn tag(self, tag: ErrorKind) -> TaggedError {
		TaggedError::new(tag, self)
	}
}
// }}}
// {{{ Setup
/// Everything read from disk before any connection is made.
#[derive(Debug, Clone)]
pub struct Setup {
	pub config: BotConfig,
	pub paths: DataPaths,
	pub ranks: RankTable,
}

impl Setup {
	pub fn from_environment() -> Result<Self, Error> {
		let paths = DataPaths::new()?;
		let config = BotConfig::load(paths.config_path())?;
		let ranks = RankTable::load(paths.ranks_path())?;

		Ok(Self {
			config,
			paths,
			ranks,
		})
	}
}

/// The outside world, behind the seams the core talks through.
#[derive(Clone)]
pub struct Services {
	pub source: Arc<dyn MetricSource>,
	pub notifier: Arc<dyn Notifier>,
	pub sync: Option<Arc<dyn TableSync>>,
}
// }}}
// {{{ UserContext
/// Custom user data passed to all command functions
#[derive(Clone)]
pub struct UserContext {
	pub config: Arc<BotConfig>,
	pub paths: DataPaths,
	pub ranks: Arc<RankTable>,
	pub checker: Arc<RankChecker>,

	pub source: Arc<dyn MetricSource>,
	pub notifier: Arc<dyn Notifier>,

	pub log_feed: LogListeners,
}

impl UserContext {
	pub fn new(setup: Setup, services: Services, log_feed: LogListeners) -> Self {
		timed!("create_context", {
			let Setup {
				config,
				paths,
				ranks,
			} = setup;
			let ranks = Arc::new(ranks);
			let settings = &config.settings;

			// The store may always rebuild from history, but only the checker
			// writes to it, and only when asked to.
			let history = HistoryLog::new(paths.history_path().clone(), settings.print_csv_changes);
			let mut store =
				StateStore::new(paths.state_path(), ranks.clone()).with_history(history.clone());
			if let Some(sync) = services.sync {
				store = store.with_sync(sync);
			}

			let mut checker = RankChecker::new(config.wiseoldman.group_id, ranks.clone(), store)
				.with_fetch_timeout(config.wiseoldman.timeout())
				.silent(settings.silent);
			if settings.print_to_csv {
				checker = checker.with_history(history);
			}

			Self {
				config: Arc::new(config),
				paths,
				ranks,
				checker: Arc::new(checker),
				source: services.source,
				notifier: services.notifier,
				log_feed,
			}
		})
	}

	#[inline]
	pub fn group_id(&self) -> u64 {
		self.config.wiseoldman.group_id
	}
}
// }}}
