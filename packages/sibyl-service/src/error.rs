pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Quota exceeded for {scope} (limit {limit} per window).")]
	QuotaExceeded { scope: String, limit: u32 },
	#[error("Invalid input: {message}")]
	InvalidInput { message: String },
	#[error("Embedding unavailable: {message}")]
	EmbeddingUnavailable { message: String },
	#[error("Retrieval unavailable: {message}")]
	RetrievalUnavailable { message: String },
	#[error("Generation unavailable: {message}")]
	GenerationUnavailable { message: String },
	#[error("Cache error: {message}")]
	Cache { message: String },
}
impl Error {
	/// Transient backend failures are retried with backoff; admission,
	/// validation, and cache bookkeeping failures never are.
	pub fn is_retryable(&self) -> bool {
		matches!(
			self,
			Self::EmbeddingUnavailable { .. }
				| Self::RetrievalUnavailable { .. }
				| Self::GenerationUnavailable { .. }
		)
	}
}

impl From<sibyl_index::Error> for Error {
	fn from(err: sibyl_index::Error) -> Self {
		Self::RetrievalUnavailable { message: err.to_string() }
	}
}
