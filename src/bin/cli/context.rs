// {{{ Imports
extern crate ehbwatch;
use async_trait::async_trait;
use ehbwatch::commands::discord::MessageContext;
use ehbwatch::context::{Error, UserContext};
use ehbwatch::ranks::checker::PromotionEvent;
use ehbwatch::ranks::notify::{rank_up_message, Notifier};
// }}}

/// Similar in scope to [ehbwatch::commands::discord::mock::MockContext],
/// except replies are printed to the standard output.
pub struct CliContext {
	pub data: UserContext,
}

impl CliContext {
	pub fn new(data: UserContext) -> Self {
		Self { data }
	}
}

impl MessageContext for CliContext {
	fn data(&self) -> &UserContext {
		&self.data
	}

	async fn reply(&mut self, text: &str) -> Result<(), Error> {
		println!("[Reply] {text}");
		Ok(())
	}

	async fn reply_ephemeral(&mut self, text: &str) -> Result<(), Error> {
		println!("[Reply (private)] {text}");
		Ok(())
	}
}

/// Prints whatever the bot would have posted to its channel.
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
	async fn notify(&self, event: &PromotionEvent) -> anyhow::Result<()> {
		self.post(&rank_up_message(event)).await
	}

	async fn post(&self, text: &str) -> anyhow::Result<()> {
		println!("\n========== Message ==========");
		println!("{text}");
		Ok(())
	}
}
