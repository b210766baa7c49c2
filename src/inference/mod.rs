pub mod backoff;
pub mod invoker;
pub mod orchestrator;
pub mod prober;

use crate::{
    config::AppConfig,
    error::{GenError, Result},
    storage::{ImageStorage, LocalImageStore},
};
use reqwest::Client;
use std::sync::Arc;

pub use backoff::{RecordingSleeper, Sleeper, TokioSleeper};
pub use invoker::ModelInvoker;
pub use orchestrator::FallbackOrchestrator;
pub use prober::EndpointProber;

const USER_AGENT: &str = concat!("rimgen/", env!("CARGO_PKG_VERSION"));

/// Everything a request handler needs, built once from the configuration.
#[derive(Clone)]
pub struct InferenceClient {
    config: Arc<AppConfig>,
    orchestrator: FallbackOrchestrator,
    prober: EndpointProber,
    storage: Arc<dyn ImageStorage>,
}

impl InferenceClient {
    pub fn new(config: AppConfig) -> Result<Self> {
        let storage: Arc<dyn ImageStorage> = Arc::new(LocalImageStore::new(
            config.images_dir.clone(),
            config.public_prefix.clone(),
        ));
        Self::with_components(config, storage, Arc::new(TokioSleeper))
    }

    pub fn with_components(
        config: AppConfig,
        storage: Arc<dyn ImageStorage>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GenError::ConfigError(format!("HTTP client setup failed: {}", e)))?;

        let invoker = ModelInvoker::new(http.clone(), config.clone(), storage.clone(), sleeper);

        Ok(Self {
            orchestrator: FallbackOrchestrator::new(config.clone(), invoker),
            prober: EndpointProber::new(http, config.clone()),
            config,
            storage,
        })
    }

    pub fn config(&self) -> &Arc<AppConfig> {
        &self.config
    }

    pub fn orchestrator(&self) -> &FallbackOrchestrator {
        &self.orchestrator
    }

    pub fn prober(&self) -> &EndpointProber {
        &self.prober
    }

    pub fn storage(&self) -> &Arc<dyn ImageStorage> {
        &self.storage
    }
}
