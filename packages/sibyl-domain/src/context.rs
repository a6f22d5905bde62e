use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::tokens::estimate_tokens;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	User,
	Assistant,
}

/// One prior exchange in the session. Insertion order is chronological;
/// the sequence is append-only upstream.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ConversationTurn {
	pub role: Role,
	pub content: String,
	#[serde(with = "time::serde::rfc3339")]
	pub timestamp: OffsetDateTime,
}

/// Number of passages (taken in the given order) whose summed cost stays
/// within `budget`. The walk stops at the first passage that would
/// overflow, keeping the selection a deterministic prefix.
pub fn passage_fit(passage_costs: &[u32], budget: u32) -> usize {
	let mut total: u32 = 0;

	for (index, cost) in passage_costs.iter().enumerate() {
		let Some(next) = total.checked_add(*cost) else {
			return index;
		};

		if next > budget {
			return index;
		}

		total = next;
	}

	passage_costs.len()
}

/// Decision for one history turn during the newest-to-oldest walk.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TurnAction {
	/// Fits verbatim into the remaining budget.
	Keep { cost: u32 },
	/// Would overflow; a summarized replacement may still fit.
	Summarize,
	/// The most recent turn alone exceeds the history budget. It is cut to
	/// fit rather than dropped; the context is never empty when the user
	/// just asked something.
	Truncate { max_tokens: u32 },
}

pub fn classify_turn(
	turn: &ConversationTurn,
	remaining: u32,
	is_most_recent: bool,
	chars_per_token: u32,
) -> TurnAction {
	let cost = estimate_tokens(&turn.content, chars_per_token);

	if cost <= remaining {
		return TurnAction::Keep { cost };
	}
	if is_most_recent {
		return TurnAction::Truncate { max_tokens: remaining };
	}

	TurnAction::Summarize
}
