// Copyright 2025 Cowboy AI, LLC.

//! Bootstrap and dependency injection
//!
//! All shared resources (repository, transaction manager, adapters, LLM
//! gateway) are built here and handed out as non-owning handles. A process
//! may use the lazily-constructed global context, or build its own via
//! [`KgContext::builder`] — tests do the latter, or call [`reset_all`].

use std::sync::{Arc, Mutex, OnceLock};

use crate::config::Settings;
use crate::domain::{DomainKgAdapter, StaticDomainGuard};
use crate::llm::{HttpLlmClient, LlmGateway};
use crate::personal::PersonalKgAdapter;
use crate::repository::{GraphRepository, InMemoryGraphRepository, TransactionManager};
use crate::resolve::{AliasResolver, EntityResolver};

/// The wired set of shared resources one engine instance runs on
#[derive(Clone)]
pub struct KgContext {
    /// Engine settings
    pub settings: Arc<Settings>,
    /// The single store of truth
    pub repository: Arc<dyn GraphRepository>,
    /// Transaction manager over the repository
    pub tx_manager: Arc<TransactionManager>,
    /// Domain-namespace adapter
    pub domain_adapter: Arc<DomainKgAdapter>,
    /// Personal-namespace adapter
    pub personal_adapter: Arc<PersonalKgAdapter>,
    /// The immutable rulebook
    pub guard: Arc<StaticDomainGuard>,
    /// Entity resolver used by the reasoner
    pub resolver: Arc<dyn EntityResolver>,
    /// LLM gateway; absent means rule-based operation
    pub gateway: Option<Arc<LlmGateway>>,
}

impl KgContext {
    /// Start building a context
    pub fn builder() -> KgContextBuilder {
        KgContextBuilder::default()
    }

    /// A context over default settings and a fresh in-memory repository
    pub fn in_memory() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`KgContext`]
#[derive(Default)]
pub struct KgContextBuilder {
    settings: Option<Settings>,
    repository: Option<Arc<dyn GraphRepository>>,
    resolver: Option<Arc<dyn EntityResolver>>,
    gateway: Option<Arc<LlmGateway>>,
    http_llm: bool,
}

impl KgContextBuilder {
    /// Use the given settings instead of built-in defaults
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Use the given repository instead of a fresh in-memory one
    pub fn repository(mut self, repository: Arc<dyn GraphRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Use the given resolver instead of the alias-dictionary one
    pub fn resolver(mut self, resolver: Arc<dyn EntityResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Use the given LLM gateway
    pub fn gateway(mut self, gateway: Arc<LlmGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Build an HTTP gateway from the settings' LLM parameters
    pub fn with_http_llm(mut self) -> Self {
        self.http_llm = true;
        self
    }

    /// Wire everything
    pub fn build(self) -> KgContext {
        let settings = Arc::new(
            self.settings
                .unwrap_or_else(|| Settings::default().with_builtin_patterns()),
        );
        let repository = self
            .repository
            .unwrap_or_else(|| Arc::new(InMemoryGraphRepository::new()));
        let tx_manager = Arc::new(TransactionManager::new(Arc::clone(&repository)));
        let domain_adapter = Arc::new(DomainKgAdapter::new(Arc::clone(&repository)));
        let personal_adapter = Arc::new(PersonalKgAdapter::new(Arc::clone(&repository)));
        let guard = Arc::new(StaticDomainGuard::new(
            &settings.static_domain.static_rules,
        ));
        let resolver = self.resolver.unwrap_or_else(|| {
            Arc::new(AliasResolver::new(settings.alias_dictionary.clone()))
        });

        let gateway = self.gateway.or_else(|| {
            if !self.http_llm {
                return None;
            }
            match HttpLlmClient::new(&settings.llm) {
                Ok(client) => Some(Arc::new(
                    LlmGateway::new(
                        Arc::new(client),
                        settings.llm.max_retries,
                        settings.llm.base_delay_ms,
                    )
                    .with_cache(settings.llm.cache_capacity),
                )),
                Err(e) => {
                    tracing::warn!(error = %e, "HTTP LLM client unavailable, running rule-based");
                    None
                }
            }
        });

        KgContext {
            settings,
            repository,
            tx_manager,
            domain_adapter,
            personal_adapter,
            guard,
            resolver,
            gateway,
        }
    }
}

static GLOBAL: OnceLock<Mutex<Option<KgContext>>> = OnceLock::new();

fn global_slot() -> &'static Mutex<Option<KgContext>> {
    GLOBAL.get_or_init(|| Mutex::new(None))
}

/// The process-wide context, constructed lazily on first use
pub fn global_context() -> KgContext {
    let mut slot = global_slot().lock().expect("global context lock");
    slot.get_or_insert_with(KgContext::in_memory).clone()
}

/// Install a specific context as the process-wide one
pub fn init_global(context: KgContext) {
    let mut slot = global_slot().lock().expect("global context lock");
    *slot = Some(context);
}

/// Drop the process-wide context so the next use starts fresh (tests)
pub fn reset_all() {
    let mut slot = global_slot().lock().expect("global context lock");
    *slot = None;
}
