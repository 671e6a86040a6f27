use ehbwatch::baserow::BaserowSync;
use ehbwatch::commands;
use ehbwatch::context::{Error, Services, Setup, UserContext};
use ehbwatch::logs::{init_logging, LogListeners};
use ehbwatch::ranks::notify::DiscordNotifier;
use ehbwatch::ranks::store::TableSync;
use ehbwatch::schedule;
use ehbwatch::wom::{MetricSource, WomClient};
use poise::serenity_prelude::{self as serenity};
use std::sync::Arc;
use tracing::{error, info};

// {{{ Error handler
async fn on_error(error: poise::FrameworkError<'_, UserContext, Error>) {
	if let Err(e) = poise::builtins::on_error(error).await {
		error!("Error while handling error: {}", e)
	}
}
// }}}

#[tokio::main]
async fn main() -> Result<(), Error> {
	let setup = Setup::from_environment()?;
	let log_feed = LogListeners::new();
	init_logging(setup.config.settings.debug, &log_feed);

	info!(
		group = setup.config.wiseoldman.group_id,
		ranks = setup.ranks.rules().len(),
		"Loaded configuration"
	);

	let token = setup.config.discord_token()?.to_owned();
	let source: Arc<dyn MetricSource> = Arc::new(WomClient::new(&setup.config.wiseoldman)?);
	let sync = BaserowSync::from_config(&setup.config.baserow)?
		.map(|sync| Arc::new(sync) as Arc<dyn TableSync>);

	if sync.is_none() {
		info!("No baserow token configured, player table sync is disabled");
	}

	// {{{ Poise options
	let options = poise::FrameworkOptions {
		commands: commands::all(),
		on_error: |error| Box::pin(on_error(error)),
		..Default::default()
	};
	// }}}
	// {{{ Start poise
	let framework = poise::Framework::builder()
		.setup(move |ctx, ready, framework| {
			Box::pin(async move {
				info!("Logged in as {}", ready.user.name);
				poise::builtins::register_globally(ctx, &framework.options().commands).await?;

				let notifier = Arc::new(DiscordNotifier::new(
					ctx.http.clone(),
					setup.config.discord.channel_id,
					setup.config.settings.post_to_discord,
				));

				let services = Services {
					source,
					notifier,
					sync,
				};

				let data = UserContext::new(setup, services, log_feed);
				tokio::spawn(schedule::start(data.clone()));

				Ok(data)
			})
		})
		.options(options)
		.build();

	let intents = serenity::GatewayIntents::non_privileged();
	let mut client = serenity::ClientBuilder::new(token, intents)
		.framework(framework)
		.await?;

	client.start().await?;
	Ok(())
	// }}}
}
