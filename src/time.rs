/// Runs a block and logs how long it took at debug level.
#[macro_export]
macro_rules! timed {
	($label:expr, $code:block) => {{
		let start = std::time::Instant::now();
		let result = { $code };
		tracing::debug!("📊 {}: {:?}", $label, start.elapsed());
		result
	}};
}
