use std::sync::Arc;

use ehbwatch::baserow::BaserowSync;
use ehbwatch::context::{Error, Services, Setup, UserContext};
use ehbwatch::logs::{init_logging, LogListeners};
use ehbwatch::ranks::store::TableSync;
use ehbwatch::wom::WomClient;

use crate::context::{CliContext, StdoutNotifier};

pub mod history;
pub mod ranks;

/// Builds the same context the bot runs with, except messages meant for
/// the channel are printed instead.
pub fn create_context() -> Result<CliContext, Error> {
	let setup = Setup::from_environment()?;
	let log_feed = LogListeners::new();
	init_logging(setup.config.settings.debug, &log_feed);

	let services = Services {
		source: Arc::new(WomClient::new(&setup.config.wiseoldman)?),
		notifier: Arc::new(StdoutNotifier),
		sync: BaserowSync::from_config(&setup.config.baserow)?
			.map(|sync| Arc::new(sync) as Arc<dyn TableSync>),
	};

	Ok(CliContext::new(UserContext::new(setup, services, log_feed)))
}
