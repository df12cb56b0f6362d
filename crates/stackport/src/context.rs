//! Wiring of the orchestrator from settings

use stackport_cloud::{
    ConsoleLinks, ContentFetcher, FileCache, Orchestrator, OrchestratorOptions, VmKind,
};
use stackport_config::Settings;
use stackport_pulumi::PulumiEngine;
use std::sync::Arc;

pub struct Context {
    settings: Settings,
    orchestrator: Orchestrator,
    fetcher: ContentFetcher,
    vm_kind: VmKind,
}

impl Context {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let engine = PulumiEngine::new(&settings.project, &settings.region, settings.work_dir()?)
            .with_binary(&settings.pulumi_binary);
        let cache = FileCache::new(settings.cache_dir()?);
        let links = ConsoleLinks::new(
            &settings.console_base,
            &settings.organization,
            &settings.project,
        );
        let options = OrchestratorOptions {
            engine_timeout: settings.engine_timeout(),
            cache_lock_timeout: settings.cache_lock_timeout(),
        };

        let orchestrator = Orchestrator::new(Arc::new(engine), Arc::new(cache), links, options);
        let fetcher = ContentFetcher::new(settings.fetch_timeout())?;
        let vm_kind = VmKind::new(
            settings
                .instance_types
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        );

        Ok(Self {
            settings,
            orchestrator,
            fetcher,
            vm_kind,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn fetcher(&self) -> &ContentFetcher {
        &self.fetcher
    }

    pub fn vm_kind(&self) -> &VmKind {
        &self.vm_kind
    }

    /// Instance type used when none is given
    pub fn default_instance_type(&self) -> &str {
        self.vm_kind
            .instance_types()
            .first()
            .map(String::as_str)
            .unwrap_or(stackport_cloud::kind::DEFAULT_INSTANCE_TYPES[0])
    }
}
