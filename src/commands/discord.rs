use poise::CreateReply;
use tracing::error;

use crate::context::{Error, ErrorKind, TaggedError, UserContext};

// {{{ Trait
pub trait MessageContext {
	/// Get the user context held by the message
	fn data(&self) -> &UserContext;

	/// Reply to the current message
	async fn reply(&mut self, text: &str) -> Result<(), Error>;

	/// Reply so that only the author can see it
	async fn reply_ephemeral(&mut self, text: &str) -> Result<(), Error>;

	/// Reports user errors back to the author. Internal errors are logged and
	/// reported with a generic prefix.
	async fn handle_error<V>(&mut self, res: Result<V, TaggedError>) -> Result<Option<V>, Error> {
		match res {
			Ok(v) => Ok(Some(v)),
			Err(e) => {
				let message = match e.kind {
					ErrorKind::User => format!("{}", e.error),
					ErrorKind::Internal => {
						error!("Command failed: {:#}", e.error);
						format!("❌ An error occurred: {:#}", e.error)
					}
				};

				self.reply_ephemeral(&message).await?;
				Ok(None)
			}
		}
	}
}
// }}}
// {{{ Poise implementation
impl<'a> MessageContext for poise::Context<'a, UserContext, Error> {
	fn data(&self) -> &UserContext {
		Self::data(*self)
	}

	async fn reply(&mut self, text: &str) -> Result<(), Error> {
		Self::reply(*self, text).await?;
		Ok(())
	}

	async fn reply_ephemeral(&mut self, text: &str) -> Result<(), Error> {
		self.send(CreateReply::default().content(text).ephemeral(true))
			.await?;
		Ok(())
	}
}
// }}}
