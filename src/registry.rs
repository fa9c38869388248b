//! Plugin registry: where the pipeline finds its scraper and generators.
//!
//! Scraper resolution runs once per registry and is cached. A process-wide
//! registry can be installed with [`install_global`] so batch workers share the
//! same resolution.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::plugins::{Capability, PluginType};

/// Free functions tried, in order, when resolving the scraper
pub const SCRAPER_FUNCTIONS: [&str; 3] = ["run_scraper", "scrape", "scrape_site"];
/// Type tried after the free functions
pub const SCRAPER_TYPE: &str = "Scraper";
/// Methods tried on [`SCRAPER_TYPE`]
pub const SCRAPER_METHODS: [&str; 2] = ["run", "scrape"];

/// Language used when nothing else is configured
pub const FALLBACK_LANGUAGE: &str = "English";

/// What the generator will be asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationTask {
    Translation,
    Sentiment,
}

impl GenerationTask {
    /// Any mode starting with "trans" selects translation; everything else is sentiment.
    pub fn from_mode(mode: &str) -> Self {
        if mode.trim().to_lowercase().starts_with("trans") {
            GenerationTask::Translation
        } else {
            GenerationTask::Sentiment
        }
    }
}

#[derive(Clone)]
pub struct ResolvedGenerator {
    pub task: GenerationTask,
    pub capability: Arc<dyn Capability>,
    /// The requested task had no generator and this is the other one
    pub is_fallback: bool,
}

#[derive(Default)]
pub struct PluginRegistry {
    functions: Vec<Arc<dyn Capability>>,
    types: Vec<Arc<PluginType>>,
    translator: Option<Arc<dyn Capability>>,
    sentiment: Option<Arc<dyn Capability>>,
    translation_languages: Vec<String>,
    scraper: OnceCell<Arc<dyn Capability>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a free function. A later registration with the same name replaces the earlier one.
    pub fn register_function<C: Capability + 'static>(&mut self, capability: C) -> &mut Self {
        self.functions.retain(|f| f.name() != capability.name());
        self.functions.push(Arc::new(capability));
        self
    }

    pub fn register_type(&mut self, ty: PluginType) -> &mut Self {
        self.types.retain(|t| t.name() != ty.name());
        self.types.push(Arc::new(ty));
        self
    }

    pub fn set_translator<C: Capability + 'static>(&mut self, capability: C) -> &mut Self {
        self.translator = Some(Arc::new(capability));
        self
    }

    pub fn set_sentiment_analyzer<C: Capability + 'static>(&mut self, capability: C) -> &mut Self {
        self.sentiment = Some(Arc::new(capability));
        self
    }

    pub fn set_translation_languages(&mut self, languages: Vec<String>) -> &mut Self {
        self.translation_languages = languages;
        self
    }

    pub fn translation_languages(&self) -> &[String] {
        &self.translation_languages
    }

    pub fn function(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.functions.iter().find(|f| f.name() == name).cloned()
    }

    pub fn plugin_type(&self, name: &str) -> Option<Arc<PluginType>> {
        self.types.iter().find(|t| t.name() == name).cloned()
    }

    pub fn translator(&self) -> Option<Arc<dyn Capability>> {
        self.translator.clone()
    }

    /// Find the scraper entry point.
    ///
    /// The first success is cached for the lifetime of the registry; a failed
    /// lookup is not cached, so a later call after registration can still succeed.
    pub fn resolve_scraper(&self) -> Result<Arc<dyn Capability>> {
        self.scraper
            .get_or_try_init(|| {
                let resolved = self.find_scraper()?;
                info!("Resolved scraper entry point '{}'", resolved.name());
                Ok(resolved)
            })
            .cloned()
    }

    fn find_scraper(&self) -> Result<Arc<dyn Capability>> {
        for name in SCRAPER_FUNCTIONS {
            if let Some(f) = self.function(name) {
                return Ok(f);
            }
        }
        if let Some(ty) = self.plugin_type(SCRAPER_TYPE) {
            for method in SCRAPER_METHODS {
                if let Some(bound) = ty.bind(method) {
                    return Ok(Arc::new(bound));
                }
            }
            debug!("Type '{}' exposes none of {:?}", SCRAPER_TYPE, SCRAPER_METHODS);
        }
        Err(PipelineError::capability_not_found(
            "scraper",
            format!(
                "expected one of {} or a '{}' type with a {} method",
                SCRAPER_FUNCTIONS.join("/"),
                SCRAPER_TYPE,
                SCRAPER_METHODS.join("/")
            ),
        ))
    }

    /// Pick the generator for `mode`, falling back to the other one when only it exists.
    pub fn resolve_generator(&self, mode: &str) -> Result<ResolvedGenerator> {
        let wanted = GenerationTask::from_mode(mode);
        let (primary, secondary) = match wanted {
            GenerationTask::Translation => (
                self.translator.clone().map(|c| (GenerationTask::Translation, c)),
                self.sentiment.clone().map(|c| (GenerationTask::Sentiment, c)),
            ),
            GenerationTask::Sentiment => (
                self.sentiment.clone().map(|c| (GenerationTask::Sentiment, c)),
                self.translator.clone().map(|c| (GenerationTask::Translation, c)),
            ),
        };

        if let Some((task, capability)) = primary {
            return Ok(ResolvedGenerator {
                task,
                capability,
                is_fallback: false,
            });
        }
        if let Some((task, capability)) = secondary {
            warn!(
                "No {:?} generator registered for mode '{}'; falling back to {:?}",
                wanted, mode, task
            );
            return Ok(ResolvedGenerator {
                task,
                capability,
                is_fallback: true,
            });
        }
        Err(PipelineError::capability_not_found(
            "generator",
            "neither a translator nor a sentiment analyzer is registered",
        ))
    }

    /// Explicit language, else the first configured one, else English.
    pub fn target_language(&self, requested: Option<&str>) -> String {
        requested
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .or_else(|| self.translation_languages.first().cloned())
            .unwrap_or_else(|| FALLBACK_LANGUAGE.to_string())
    }
}

static GLOBAL_REGISTRY: OnceCell<Arc<PluginRegistry>> = OnceCell::new();

/// Install the process-wide registry. Only the first install takes effect.
pub fn install_global(registry: PluginRegistry) -> Arc<PluginRegistry> {
    let mut fresh = Some(registry);
    let installed = GLOBAL_REGISTRY.get_or_init(|| Arc::new(fresh.take().unwrap_or_default()));
    if fresh.is_some() {
        warn!("Global plugin registry already installed; ignoring replacement");
    }
    Arc::clone(installed)
}

pub fn global() -> Option<Arc<PluginRegistry>> {
    GLOBAL_REGISTRY.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{invoke, CallArgs, FnCapability, PluginInstance, Signature};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn constant(name: &str, out: &'static str) -> FnCapability {
        FnCapability::new(name, Signature::named(["url"]), move |_| Ok(json!(out)))
    }

    struct Fixed(&'static str);

    impl PluginInstance for Fixed {
        fn call_method(&self, _method: &str, _args: CallArgs) -> Result<Value> {
            Ok(json!(self.0))
        }
    }

    fn scraper_type(methods: &[&str], built: Arc<AtomicUsize>) -> PluginType {
        let mut ty = PluginType::new(SCRAPER_TYPE, Signature::named(["url"]), move |_| {
            built.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Fixed("typed")) as Box<dyn PluginInstance>)
        });
        for m in methods {
            ty = ty.with_method(*m, Signature::named(Vec::<String>::new()));
        }
        ty
    }

    #[test]
    fn test_function_priority_order() {
        let mut registry = PluginRegistry::new();
        registry
            .register_function(constant("scrape_site", "c"))
            .register_function(constant("scrape", "b"));
        assert_eq!(registry.resolve_scraper().unwrap().name(), "scrape");
    }

    #[test]
    fn test_falls_back_to_scraper_type() {
        let built = Arc::new(AtomicUsize::new(0));
        let mut registry = PluginRegistry::new();
        registry.register_type(scraper_type(&["scrape"], Arc::clone(&built)));

        let scraper = registry.resolve_scraper().unwrap();
        assert_eq!(scraper.name(), "Scraper.scrape");
        let out = invoke(scraper.as_ref(), &CallArgs::new()).unwrap();
        assert_eq!(out, json!("typed"));
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_type_without_known_method_is_not_found() {
        let mut registry = PluginRegistry::new();
        registry.register_type(scraper_type(&["execute"], Arc::new(AtomicUsize::new(0))));
        let err = registry.resolve_scraper().err().unwrap();
        assert!(matches!(err, PipelineError::CapabilityNotFound { .. }));
    }

    #[test]
    fn test_resolution_is_cached() {
        let mut registry = PluginRegistry::new();
        registry.register_type(scraper_type(&["run"], Arc::new(AtomicUsize::new(0))));
        assert_eq!(registry.resolve_scraper().unwrap().name(), "Scraper.run");

        registry.register_function(constant("run_scraper", "a"));
        assert_eq!(registry.resolve_scraper().unwrap().name(), "Scraper.run");
    }

    #[test]
    fn test_failed_resolution_is_retried() {
        let mut registry = PluginRegistry::new();
        assert!(registry.resolve_scraper().is_err());
        registry.register_function(constant("scrape", "a"));
        assert_eq!(registry.resolve_scraper().unwrap().name(), "scrape");
    }

    #[test]
    fn test_generator_mode_prefix() {
        assert_eq!(GenerationTask::from_mode("translation"), GenerationTask::Translation);
        assert_eq!(GenerationTask::from_mode("Trans"), GenerationTask::Translation);
        assert_eq!(GenerationTask::from_mode("sentiment"), GenerationTask::Sentiment);
        assert_eq!(GenerationTask::from_mode("anything"), GenerationTask::Sentiment);
    }

    #[test]
    fn test_generator_fallback() {
        let mut registry = PluginRegistry::new();
        registry.set_translator(FnCapability::new("translate", Signature::any(), |_| {
            Ok(json!("t"))
        }));
        let resolved = registry.resolve_generator("sentiment").unwrap();
        assert_eq!(resolved.task, GenerationTask::Translation);
        assert_eq!(resolved.capability.name(), "translate");
        assert!(resolved.is_fallback);
    }

    #[test]
    fn test_no_generator() {
        let err = PluginRegistry::new().resolve_generator("translation").err().unwrap();
        assert!(err.is_fatal());
        assert!(err.to_string().starts_with("No generator capability available"));
    }

    #[test]
    fn test_target_language_order() {
        let mut registry = PluginRegistry::new();
        assert_eq!(registry.target_language(None), "English");
        registry.set_translation_languages(vec!["French".into(), "English".into()]);
        assert_eq!(registry.target_language(None), "French");
        assert_eq!(registry.target_language(Some("  ")), "French");
        assert_eq!(registry.target_language(Some("Arabic")), "Arabic");
    }

    #[test]
    fn test_global_install_keeps_first() {
        let mut first = PluginRegistry::new();
        first.set_translation_languages(vec!["Spanish".into()]);
        let installed = install_global(first);
        let again = install_global(PluginRegistry::new());
        assert!(Arc::ptr_eq(&installed, &again));
        assert!(Arc::ptr_eq(&installed, &global().unwrap()));
    }
}
