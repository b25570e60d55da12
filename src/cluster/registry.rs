//! Explicit registry of client factories, keyed by deployment target

use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::ClientFactory;
use crate::config::{options, Configuration};
use crate::error::{LaneError, LaneResult};
use crate::rest::{DirectSessionFactory, YarnSessionFactory};

/// Maps `execution.target` names to the factory that serves them
#[derive(Default, Clone)]
pub struct FactoryRegistry {
    factories: BTreeMap<String, Arc<dyn ClientFactory>>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the REST-backed factories for every session target
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DirectSessionFactory::remote()));
        registry.register(Arc::new(DirectSessionFactory::kubernetes_session()));
        registry.register(Arc::new(YarnSessionFactory::new()));
        registry
    }

    /// Register a factory under its target name, replacing any previous one
    pub fn register(&mut self, factory: Arc<dyn ClientFactory>) -> &mut Self {
        let target = factory.target().to_string();
        debug!("registering client factory for {}", target);
        self.factories.insert(target, factory);
        self
    }

    pub fn get(&self, target: &str) -> Option<Arc<dyn ClientFactory>> {
        self.factories.get(target).cloned()
    }

    /// Registered target names, sorted
    pub fn targets(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Look up the factory named by `execution.target`
    pub fn resolve(&self, config: &Configuration) -> LaneResult<Arc<dyn ClientFactory>> {
        let target = config.get(options::EXECUTION_TARGET).ok_or_else(|| {
            LaneError::configuration(format!("{} is not set", options::EXECUTION_TARGET))
        })?;
        self.get(target).ok_or_else(|| {
            LaneError::resolution(
                format!(
                    "no client factory for target '{}' (registered: {})",
                    target,
                    self.targets().join(", ")
                ),
                None,
            )
        })
    }
}

impl std::fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("targets", &self.targets())
            .finish()
    }
}
