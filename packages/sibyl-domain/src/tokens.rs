//! Length-based token estimation. Deterministic and monotonic: a longer
//! text never estimates cheaper than a shorter one.

/// Ceil of `chars / chars_per_token`, so any non-empty text costs at least
/// one token.
pub fn estimate_tokens(text: &str, chars_per_token: u32) -> u32 {
	let chars_per_token = chars_per_token.max(1) as usize;
	let chars = text.chars().count();
	let tokens = chars.div_ceil(chars_per_token);

	u32::try_from(tokens).unwrap_or(u32::MAX)
}

/// Longest prefix of `text` that estimates at or below `max_tokens`,
/// cut on a char boundary.
pub fn truncate_to_tokens(text: &str, max_tokens: u32, chars_per_token: u32) -> String {
	let budget_chars = (max_tokens as usize).saturating_mul(chars_per_token.max(1) as usize);

	text.chars().take(budget_chars).collect()
}
