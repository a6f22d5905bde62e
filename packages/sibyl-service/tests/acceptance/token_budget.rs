use std::sync::Arc;

use rand::{Rng, SeedableRng, rngs::StdRng};
use time::OffsetDateTime;

use sibyl_domain::context::{ConversationTurn, Role};
use sibyl_service::{Providers, SibylService, TurnDisposition};
use sibyl_testkit::MemoryIndex;

use super::{FailingSummary, StubEmbedding, StubGeneration, VECTOR_DIM, test_config};

fn turn(content: &str) -> ConversationTurn {
	ConversationTurn {
		role: Role::User,
		content: content.to_string(),
		timestamp: OffsetDateTime::UNIX_EPOCH,
	}
}

fn history_only_service(token_budget: u32) -> SibylService {
	let mut cfg = test_config();

	cfg.context.token_budget = token_budget;
	cfg.context.retrieval_budget = 0;

	super::build_service(cfg, MemoryIndex::new())
}

#[tokio::test]
async fn keeps_only_the_newest_turns_that_fit() {
	// 16-char turns cost 4 tokens each at 4 chars per token; a 40-token
	// budget holds exactly the 10 newest of 50.
	let service = history_only_service(40);
	let history: Vec<ConversationTurn> =
		(0..50).map(|index| turn(&format!("turn {index:04} filler"))).collect();
	let assembled = service.assemble(&history, &[]).await;

	assert_eq!(assembled.turns.len(), 10);
	// Chronological order, oldest kept first, newest last.
	assert!(assembled.turns[0].content.contains("0040"));
	assert!(assembled.turns[9].content.contains("0049"));
	assert!(assembled.turns.iter().all(|kept| kept.disposition == TurnDisposition::Verbatim));
	assert!(assembled.estimated_tokens <= 40);
}

#[tokio::test]
async fn oversized_older_turn_is_summarized() {
	let service = history_only_service(400);
	let history = vec![turn(&"x".repeat(4_000)), turn("most recent question")];
	let assembled = service.assemble(&history, &[]).await;

	assert_eq!(assembled.turns.len(), 2);
	assert_eq!(assembled.turns[0].disposition, TurnDisposition::Summarized);
	assert_eq!(assembled.turns[1].disposition, TurnDisposition::Verbatim);
	assert!(assembled.estimated_tokens <= 400);
}

#[tokio::test]
async fn oversized_most_recent_turn_is_truncated_not_summarized() {
	let service = history_only_service(50);
	let history = vec![turn("older context"), turn(&"y".repeat(4_000))];
	let assembled = service.assemble(&history, &[]).await;

	// The truncated newest turn exhausts the budget; the older turn is
	// dropped entirely.
	assert_eq!(assembled.turns.len(), 1);
	assert_eq!(assembled.turns[0].disposition, TurnDisposition::Truncated);
	assert!(assembled.turns[0].tokens <= 50);
}

#[tokio::test]
async fn random_length_histories_never_exceed_the_budget() {
	let mut rng = StdRng::seed_from_u64(0xB0D9E7);

	for round in 0..300 {
		let token_budget = rng.gen_range(10_u32..500);
		let service = history_only_service(token_budget);
		let history: Vec<ConversationTurn> = (0..rng.gen_range(0..30))
			.map(|_| turn(&"w".repeat(rng.gen_range(1..2_000))))
			.collect();
		let assembled = service.assemble(&history, &[]).await;

		assert!(
			assembled.estimated_tokens <= token_budget,
			"round {round}: {} estimated tokens over a budget of {token_budget}",
			assembled.estimated_tokens
		);
	}
}

#[tokio::test]
async fn summarizer_failure_drops_older_turns_but_keeps_the_rest() {
	let mut cfg = test_config();

	cfg.context.token_budget = 400;
	cfg.context.retrieval_budget = 0;

	let providers = Providers::new(
		Arc::new(StubEmbedding { vector_dim: VECTOR_DIM }),
		Arc::new(StubGeneration),
		Arc::new(FailingSummary),
	);
	let service =
		SibylService::with_providers(cfg, Arc::new(MemoryIndex::new()), providers);
	let history = vec![turn("oldest"), turn(&"z".repeat(4_000)), turn("newest question")];
	let assembled = service.assemble(&history, &[]).await;

	// The walk stops at the turn that needed summarizing; newer turns
	// already admitted stay.
	assert_eq!(assembled.turns.len(), 1);
	assert_eq!(assembled.turns[0].content, "newest question");
}
