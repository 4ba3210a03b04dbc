//! Wiring: config in, engine components out.

use anyhow::Context;
use hearth_config::AppConfig;
use hearth_context::{
    AssemblerOptions, BackgroundScheduler, BudgetCalculator, ContextAssembler, HeuristicEstimator,
    ModelTable, SummarizationScheduler, SummarizationSettings, TitleScheduler, TitleSettings,
};
use hearth_core::{ChatStore, CheapGenerator, MemorySearch, TokenEstimator};
use std::path::Path;
use std::sync::Arc;

/// Load config from `path` if given, else from the default location.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            config.apply_env();
            Ok(config)
        }
        None => Ok(AppConfig::load()?),
    }
}

/// Shared components built once from config.
pub struct Runtime {
    pub config: AppConfig,
    pub budgets: Arc<BudgetCalculator>,
    pub estimator: Arc<dyn TokenEstimator>,
}

impl Runtime {
    pub fn new(config: AppConfig) -> Self {
        let budgets = Arc::new(BudgetCalculator::new(ModelTable::from_config(&config.context)));
        Self {
            config,
            budgets,
            estimator: Arc::new(HeuristicEstimator::new()),
        }
    }

    pub fn assembler(&self, memory: Option<Arc<dyn MemorySearch>>) -> ContextAssembler {
        ContextAssembler::new(
            self.estimator.clone(),
            memory,
            self.budgets.clone(),
            AssemblerOptions::from(&self.config),
        )
    }

    pub fn scheduler(
        &self,
        store: Arc<dyn ChatStore>,
        generator: Option<Arc<dyn CheapGenerator>>,
    ) -> BackgroundScheduler {
        let summarizer = SummarizationScheduler::new(
            store.clone(),
            generator.clone(),
            self.estimator.clone(),
            self.budgets.clone(),
            SummarizationSettings::from(&self.config.summarization),
        );
        let titles = TitleScheduler::new(
            store,
            generator,
            TitleSettings::from(&self.config.titles),
        );
        BackgroundScheduler::new(summarizer, titles)
    }

    /// The conversational model: fixture override first, then config.
    pub fn model<'a>(
        &'a self,
        provider: Option<&'a str>,
        model: Option<&'a str>,
    ) -> (&'a str, &'a str) {
        (
            provider.unwrap_or(&self.config.provider),
            model.unwrap_or(&self.config.model),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_model_overrides_config() {
        let runtime = Runtime::new(AppConfig::default());
        assert_eq!(
            runtime.model(Some("openai"), Some("gpt-4o")),
            ("openai", "gpt-4o")
        );
        let (provider, _) = runtime.model(None, None);
        assert_eq!(provider, "openrouter");
    }

    #[test]
    fn custom_profiles_reach_the_budget() {
        let mut config = AppConfig::default();
        config.context.models.push(hearth_config::ModelProfileConfig {
            provider: "local".into(),
            model: "tiny".into(),
            context_limit: 2_000,
            allocation: None,
        });
        let runtime = Runtime::new(config);
        assert_eq!(runtime.budgets.calculate("local", "tiny").total_limit, 2_000);
    }
}
