use async_trait::async_trait;
use stackport_cloud::cache::CacheResult;
use stackport_cloud::{
    AuthStatus, CacheError, ConsoleLinks, EngineClient, EngineError, ListingCache, MemoryCache,
    Orchestrator, OrchestratorOptions, ProgressObserver, Program, StackHandle, StackInfo,
    StackOutputs, Summary,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory stand-in for the provisioning engine
#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    stacks: BTreeMap<String, StackOutputs>,
    busy: HashSet<String>,
    calls: Vec<String>,
    apply_delay: Option<Duration>,
    fail_apply: Option<String>,
}

#[allow(dead_code)]
impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a stack that already exists with the given outputs
    pub fn seed(&self, name: &str, outputs: StackOutputs) {
        self.state
            .lock()
            .unwrap()
            .stacks
            .insert(name.to_string(), outputs);
    }

    /// Pretend another apply of `name` is in flight
    pub fn mark_busy(&self, name: &str) {
        self.state.lock().unwrap().busy.insert(name.to_string());
    }

    pub fn set_apply_delay(&self, delay: Duration) {
        self.state.lock().unwrap().apply_delay = Some(delay);
    }

    pub fn fail_apply_with(&self, message: &str) {
        self.state.lock().unwrap().fail_apply = Some(message.to_string());
    }

    pub fn has_stack(&self, name: &str) -> bool {
        self.state.lock().unwrap().stacks.contains_key(name)
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(':').next() == Some(operation))
            .count()
    }

    fn record(&self, operation: &str, name: &str) {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(format!("{operation}:{name}"));
    }
}

/// Resolve the program outputs the way the engine would after an apply
fn resolve_outputs(name: &str, program: &Program) -> StackOutputs {
    program
        .outputs
        .iter()
        .map(|(key, value)| {
            let raw = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let resolved = match raw.as_str() {
                "${site-bucket.websiteEndpoint}" => format!("{name}.s3-website.example.com"),
                "${server.publicDns}" => format!("ec2-{name}.compute-1.amazonaws.com"),
                "${server.publicIp}" => "203.0.113.10".to_string(),
                _ => raw.replace("$${", "${"),
            };
            (key.clone(), resolved)
        })
        .collect()
}

#[async_trait]
impl EngineClient for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    async fn check_auth(&self) -> Result<AuthStatus, EngineError> {
        Ok(AuthStatus::ok("tester"))
    }

    async fn create(&self, name: &str, program: Program) -> Result<StackHandle, EngineError> {
        self.record("create", name);
        let mut state = self.state.lock().unwrap();
        if state.stacks.contains_key(name) {
            return Err(EngineError::AlreadyExists(name.to_string()));
        }
        state.stacks.insert(name.to_string(), StackOutputs::new());
        Ok(StackHandle::new(name, program))
    }

    async fn select(&self, name: &str, program: Program) -> Result<StackHandle, EngineError> {
        self.record("select", name);
        if !self.has_stack(name) {
            return Err(EngineError::NotFound(name.to_string()));
        }
        Ok(StackHandle::new(name, program))
    }

    async fn apply(
        &self,
        stack: &StackHandle,
        observer: &dyn ProgressObserver,
    ) -> Result<StackOutputs, EngineError> {
        self.record("apply", &stack.name);
        let delay = {
            let state = self.state.lock().unwrap();
            if state.busy.contains(&stack.name) {
                return Err(EngineError::ConcurrentUpdate(stack.name.clone()));
            }
            if let Some(message) = &state.fail_apply {
                return Err(EngineError::Failed(message.clone()));
            }
            state.apply_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        observer.on_output(&format!("Updating ({})", stack.name));
        let outputs = resolve_outputs(&stack.name, &stack.program);
        self.state
            .lock()
            .unwrap()
            .stacks
            .insert(stack.name.clone(), outputs.clone());
        observer.on_output("Update complete");
        Ok(outputs)
    }

    async fn destroy(
        &self,
        stack: &StackHandle,
        observer: &dyn ProgressObserver,
    ) -> Result<(), EngineError> {
        self.record("destroy", &stack.name);
        let mut state = self.state.lock().unwrap();
        if state.busy.contains(&stack.name) {
            return Err(EngineError::ConcurrentUpdate(stack.name.clone()));
        }
        match state.stacks.get_mut(&stack.name) {
            Some(outputs) => {
                *outputs = StackOutputs::new();
                observer.on_output("Destroy complete");
                Ok(())
            }
            None => Err(EngineError::NotFound(stack.name.clone())),
        }
    }

    async fn forget(&self, name: &str) -> Result<(), EngineError> {
        self.record("forget", name);
        self.state.lock().unwrap().stacks.remove(name);
        Ok(())
    }

    async fn outputs(&self, name: &str) -> Result<StackOutputs, EngineError> {
        self.record("outputs", name);
        self.state
            .lock()
            .unwrap()
            .stacks
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(name.to_string()))
    }

    async fn list_all(&self) -> Result<Vec<StackInfo>, EngineError> {
        self.record("list", "*");
        Ok(self
            .state
            .lock()
            .unwrap()
            .stacks
            .iter()
            .map(|(name, outputs)| StackInfo {
                name: name.clone(),
                outputs: outputs.clone(),
            })
            .collect())
    }
}

/// Cache whose store accepts reads but rejects writes
#[derive(Default)]
pub struct ReadOnlyCache {
    inner: MemoryCache,
}

#[allow(dead_code)]
impl ReadOnlyCache {
    pub async fn preload(&self, key: &str, summaries: &[Summary]) {
        self.inner.set(key, summaries).await.unwrap();
    }
}

#[async_trait]
impl ListingCache for ReadOnlyCache {
    async fn exists(&self, key: &str) -> CacheResult<bool> {
        self.inner.exists(key).await
    }

    async fn get(&self, key: &str) -> CacheResult<Vec<Summary>> {
        self.inner.get(key).await
    }

    async fn set(&self, _key: &str, _summaries: &[Summary]) -> CacheResult<()> {
        Err(CacheError::Io(std::io::Error::other("store unavailable")))
    }

    async fn invalidate(&self, key: &str) -> CacheResult<()> {
        self.inner.invalidate(key).await
    }
}

pub fn links() -> ConsoleLinks {
    ConsoleLinks::new("https://app.pulumi.com", "acme", "stackport")
}

#[allow(dead_code)]
pub fn orchestrator(engine: Arc<FakeEngine>, cache: Arc<dyn ListingCache>) -> Orchestrator {
    Orchestrator::new(engine, cache, links(), OrchestratorOptions::default())
}

#[allow(dead_code)]
pub fn site_outputs(name: &str) -> StackOutputs {
    StackOutputs::new()
        .with("website_url", format!("{name}.s3-website.example.com"))
        .with("website_content", "<p>seeded</p>")
}

#[allow(dead_code)]
pub fn vm_outputs(name: &str) -> StackOutputs {
    StackOutputs::new()
        .with("instance_type", "t2.micro")
        .with("public_key", "ssh-ed25519 AAAA seeded")
        .with("public_ip", "203.0.113.10")
        .with("public_dns", format!("ec2-{name}.compute-1.amazonaws.com"))
}
