use std::sync::Arc;

use crate::{
    Config, Engine, Result, StoreType,
    executors::{ExecutorRegistry, NodeExecutor},
    flow::CostTable,
    store::{DbStore, MemStore},
};

/// Assembles an [`Engine`].
///
/// Starts from [`Config::default`], the built-in executors and an in-memory
/// store; every setter overrides one piece.
pub struct EngineBuilder {
    config: Config,
    registry: ExecutorRegistry,
    backend: Option<Box<dyn DbStore>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            registry: ExecutorRegistry::new(),
            backend: None,
        }
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn registry(
        mut self,
        registry: ExecutorRegistry,
    ) -> Self {
        self.registry = registry;
        self
    }

    pub fn executor(
        mut self,
        executor: Arc<dyn NodeExecutor>,
    ) -> Self {
        self.registry.register(executor);
        self
    }

    /// Persist through `backend` instead of the configured store type.
    pub fn store(
        mut self,
        backend: Box<dyn DbStore>,
    ) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn max_concurrency(
        mut self,
        n: usize,
    ) -> Self {
        self.config.max_concurrency = n;
        self
    }

    pub fn strict_budget(
        mut self,
        strict: bool,
    ) -> Self {
        self.config.strict_budget = strict;
        self
    }

    pub fn costs(
        mut self,
        costs: CostTable,
    ) -> Self {
        self.config.costs = costs;
        self
    }

    pub fn build(self) -> Result<Engine> {
        self.config.check()?;

        let backend = match self.backend {
            Some(backend) => backend,
            None => match self.config.store.store_type {
                StoreType::Mem => Box::new(MemStore::new()),
            },
        };

        Engine::new(self.config, self.registry, backend.as_ref())
    }
}
