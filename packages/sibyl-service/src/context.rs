use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use sibyl_domain::{
	context::{ConversationTurn, Role, TurnAction, classify_turn, passage_fit},
	tokens::{estimate_tokens, truncate_to_tokens},
};
use sibyl_index::SearchHit;

use crate::SibylService;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ContextPassage {
	pub record_id: Uuid,
	pub source_type: String,
	pub source_id: String,
	pub text: String,
	pub tokens: u32,
	pub score: f32,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDisposition {
	Verbatim,
	Summarized,
	Truncated,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ContextTurn {
	pub role: Role,
	pub content: String,
	pub tokens: u32,
	pub disposition: TurnDisposition,
}

/// The bounded prompt input: retrieved passages plus as much recent
/// history as fits. Total estimated tokens never exceed the configured
/// budget.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AssembledContext {
	pub passages: Vec<ContextPassage>,
	/// Chronological order, oldest first.
	pub turns: Vec<ContextTurn>,
	pub estimated_tokens: u32,
}
impl AssembledContext {
	pub fn render_prompt(&self, query: &str) -> String {
		let mut prompt = String::new();

		if !self.passages.is_empty() {
			prompt.push_str("Relevant passages:\n");

			for (index, passage) in self.passages.iter().enumerate() {
				prompt.push_str(&format!(
					"[{}] ({} {}) {}\n",
					index + 1,
					passage.source_type,
					passage.source_id,
					passage.text,
				));
			}

			prompt.push('\n');
		}
		if !self.turns.is_empty() {
			prompt.push_str("Conversation so far:\n");

			for turn in &self.turns {
				let speaker = match turn.role {
					Role::User => "User",
					Role::Assistant => "Assistant",
				};

				prompt.push_str(&format!("{speaker}: {}\n", turn.content));
			}

			prompt.push('\n');
		}

		prompt.push_str(&format!(
			"Answer the question using only the passages above. Cite passage numbers.\n\
			Question: {query}\n"
		));

		prompt
	}
}

impl SibylService {
	/// Fills the reserved passage sub-budget in score order, then walks
	/// history newest to oldest into the remainder. An overflowing turn is
	/// summarized once; if the summary still overflows (or the summarizer
	/// fails) the walk stops and everything older is dropped. Passages are
	/// never evicted in favor of turns.
	pub async fn assemble(
		&self,
		history: &[ConversationTurn],
		hits: &[SearchHit],
	) -> AssembledContext {
		let chars_per_token = self.cfg.context.chars_per_token;
		let passage_costs: Vec<u32> =
			hits.iter().map(|hit| estimate_tokens(&hit.record.text, chars_per_token)).collect();
		let take = passage_fit(&passage_costs, self.cfg.context.retrieval_budget);
		let passages: Vec<ContextPassage> = hits[..take]
			.iter()
			.zip(&passage_costs)
			.map(|(hit, tokens)| ContextPassage {
				record_id: hit.record.id,
				source_type: hit.record.metadata.source_type.clone(),
				source_id: hit.record.metadata.source_id.clone(),
				text: hit.record.text.clone(),
				tokens: *tokens,
				score: hit.score,
			})
			.collect();
		let passage_tokens: u32 = passages.iter().map(|passage| passage.tokens).sum();

		// Passages at most fill their reserve, so history always keeps a
		// non-zero share of the budget.
		let history_budget = self.cfg.context.token_budget - passage_tokens;
		let mut remaining = history_budget;
		// Newest first while walking; reversed before returning.
		let mut turns: Vec<ContextTurn> = Vec::new();

		for (offset, turn) in history.iter().rev().enumerate() {
			if remaining == 0 {
				break;
			}

			match classify_turn(turn, remaining, offset == 0, chars_per_token) {
				TurnAction::Keep { cost } => {
					turns.push(ContextTurn {
						role: turn.role,
						content: turn.content.clone(),
						tokens: cost,
						disposition: TurnDisposition::Verbatim,
					});

					remaining -= cost;
				},
				TurnAction::Truncate { max_tokens } => {
					let content = truncate_to_tokens(&turn.content, max_tokens, chars_per_token);
					let cost = estimate_tokens(&content, chars_per_token);

					turns.push(ContextTurn {
						role: turn.role,
						content,
						tokens: cost,
						disposition: TurnDisposition::Truncated,
					});

					break;
				},
				TurnAction::Summarize => {
					let target = self.cfg.context.summary_target_tokens.min(remaining);
					let summary = self
						.providers
						.summarizer
						.summarize(&self.cfg.providers.summarizer, &turn.content, target)
						.await;

					match summary {
						Ok(summary) => {
							let cost = estimate_tokens(&summary, chars_per_token);

							if cost > remaining {
								break;
							}

							turns.push(ContextTurn {
								role: turn.role,
								content: summary,
								tokens: cost,
								disposition: TurnDisposition::Summarized,
							});

							remaining -= cost;
						},
						Err(err) => {
							debug!(error = %err, "Summarizer failed; dropping older turns.");

							break;
						},
					}
				},
			}
		}

		turns.reverse();

		let turn_tokens: u32 = turns.iter().map(|turn| turn.tokens).sum();

		AssembledContext { passages, turns, estimated_tokens: passage_tokens + turn_tokens }
	}
}
