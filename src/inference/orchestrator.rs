use crate::{
    config::AppConfig,
    error::{GenError, Result},
    inference::invoker::ModelInvoker,
    logger,
    models::{AggregateResult, GenerationOutcome},
    prompt,
};
use std::sync::Arc;

/// Tries the configured models strictly in list order until one succeeds.
#[derive(Clone)]
pub struct FallbackOrchestrator {
    config: Arc<AppConfig>,
    invoker: ModelInvoker,
}

impl FallbackOrchestrator {
    pub fn new(config: Arc<AppConfig>, invoker: ModelInvoker) -> Self {
        Self { config, invoker }
    }

    pub async fn generate(&self, prompt: &str) -> Result<AggregateResult> {
        let prompt = self.preflight(prompt)?;
        let _timer = logger::timer("generate");

        let mut result = AggregateResult::new();
        let total = self.config.models.len();
        for (idx, model) in self.config.models.iter().enumerate() {
            log::info!("🔄 Trying model {}/{}: {}", idx + 1, total, model.name);
            let outcome = self.invoker.invoke(model, prompt).await;
            let succeeded = outcome.is_success();
            result.push(outcome);
            if succeeded {
                log::info!("✅ Generated with {} (model {}/{})", model.name, idx + 1, total);
                return Ok(result);
            }
        }

        log::error!(
            "❌ All {} models failed for prompt: {:?}",
            total,
            truncate_prompt(prompt)
        );
        Ok(result)
    }

    /// Runs exactly one named model, without fallback.
    pub async fn generate_with_model(
        &self,
        prompt: &str,
        selector: &str,
    ) -> Result<GenerationOutcome> {
        let prompt = self.preflight(prompt)?;
        let model = self.config.find_model(selector).ok_or_else(|| {
            GenError::ValidationError(format!("Unknown model: {}", selector.trim()))
        })?;
        let _timer = logger::timer("generate_with_model");
        log::info!("🎯 Generating with requested model {}", model.name);
        Ok(self.invoker.invoke(model, prompt).await)
    }

    /// Returns the prompt as submitted; enhancement trims it later.
    fn preflight<'a>(&self, prompt: &'a str) -> Result<&'a str> {
        prompt::validate(prompt, self.config.min_prompt_chars)?;
        if self.config.models.is_empty() {
            return Err(GenError::ConfigError("No models configured".into()));
        }
        if self.config.token().is_none() {
            return Err(GenError::ConfigError(
                "HF_API_TOKEN is not configured".into(),
            ));
        }
        Ok(prompt)
    }
}

fn truncate_prompt(prompt: &str) -> String {
    prompt.chars().take(80).collect()
}
