use std::sync::Arc;

use sibyl_index::QdrantIndex;
use sibyl_service::SibylService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SibylService>,
}
impl AppState {
	pub fn new(config: sibyl_config::Config) -> color_eyre::Result<Self> {
		let index = QdrantIndex::new(&config.index.qdrant)?;
		let service = SibylService::new(config, Arc::new(index));

		Ok(Self { service: Arc::new(service) })
	}

	pub fn with_service(service: SibylService) -> Self {
		Self { service: Arc::new(service) }
	}
}
