use std::time::Duration;

use color_eyre::Result;
use reqwest::Client;
use serde_json::Value;

use crate::generation::parse_completion_response;

/// Condenses one conversation turn so it can fit a context budget. The
/// summarization itself is the model's job; this client only frames the
/// request and bounds the output length.
pub async fn summarize(
	cfg: &sibyl_config::LlmProviderConfig,
	text: &str,
	target_tokens: u32,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let instruction = format!(
		"Summarize the following conversation turn in at most {target_tokens} tokens. \
		Keep names, identifiers, and decisions. Reply with the summary only.\n\n{text}"
	);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"max_tokens": target_tokens,
		"messages": [
			{ "role": "user", "content": instruction }
		],
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_completion_response(json)
}
