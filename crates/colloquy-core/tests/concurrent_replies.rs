//! Concurrency properties of the reply path: same-user turns serialize,
//! different users run in parallel, and history never corrupts under
//! simultaneous access.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use colloquy_core::chat::orchestrator::ConversationOrchestrator;
use colloquy_core::chat::prefs::InMemoryPreferences;
use colloquy_core::llm::adapter::{AdapterFactory, ChatAdapter, PromptRequest};
use colloquy_core::llm::box_adapter::BoxChatAdapter;
use colloquy_core::llm::registry::ModelRegistry;
use colloquy_types::chat::ChatRole;
use colloquy_types::config::{OrchestratorSettings, RegistrySettings};
use colloquy_types::error::AdapterError;
use colloquy_types::model::{GenerationParams, ModelDescriptor, ProviderSpec};
use colloquy_types::persona::{DEFAULT_PERSONA, PersonaDescriptor};

/// Adapter that sleeps to force overlap and tracks how many calls are
/// in flight at once.
#[derive(Clone)]
struct SlowAdapter {
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl SlowAdapter {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ChatAdapter for SlowAdapter {
    fn kind(&self) -> &'static str {
        "slow"
    }

    async fn call(&self, _request: &PromptRequest) -> Result<String, AdapterError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok("pong".to_string())
    }
}

struct SlowFactory {
    adapter: SlowAdapter,
}

impl AdapterFactory for SlowFactory {
    fn build(&self, _descriptor: &ModelDescriptor) -> Result<BoxChatAdapter, AdapterError> {
        Ok(BoxChatAdapter::new(self.adapter.clone()))
    }
}

fn descriptor(name: &str) -> ModelDescriptor {
    ModelDescriptor {
        name: name.to_string(),
        description: None,
        endpoint: None,
        api_key: None,
        model_id: name.to_string(),
        params: GenerationParams::default(),
        response_path: None,
        provider: ProviderSpec::LocalServer,
    }
}

fn orchestrator(
    adapter: SlowAdapter,
) -> Arc<ConversationOrchestrator<InMemoryPreferences>> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let registry = Arc::new(ModelRegistry::new(
        Arc::new(SlowFactory { adapter }),
        RegistrySettings::default(),
    ));
    registry.refresh(vec![descriptor("alpha")], "alpha");
    Arc::new(ConversationOrchestrator::new(
        registry,
        InMemoryPreferences::new(),
        vec![PersonaDescriptor::new(DEFAULT_PERSONA, "You are helpful.")],
        OrchestratorSettings::default(),
    ))
}

#[tokio::test]
async fn same_user_replies_serialize() {
    let adapter = SlowAdapter::new(Duration::from_millis(50));
    let orchestrator = orchestrator(adapter.clone());

    let a = {
        let o = Arc::clone(&orchestrator);
        tokio::spawn(async move { o.reply("u1", "first").await })
    };
    let b = {
        let o = Arc::clone(&orchestrator);
        tokio::spawn(async move { o.reply("u1", "second").await })
    };
    let (a, b) = (a.await.unwrap(), b.await.unwrap());
    assert_eq!(a, vec!["pong"]);
    assert_eq!(b, vec!["pong"]);

    // The per-user lock must have kept the calls from overlapping.
    assert_eq!(adapter.max_in_flight.load(Ordering::SeqCst), 1);

    // History is equivalent to some sequential ordering of the two
    // turns: four messages, strictly alternating roles.
    let session = orchestrator.store().session("u1");
    let session = session.lock().await;
    assert_eq!(session.len(), 4);
    let roles: Vec<ChatRole> = session.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            ChatRole::User,
            ChatRole::Assistant,
            ChatRole::User,
            ChatRole::Assistant
        ]
    );
    let users: Vec<&str> = session
        .messages
        .iter()
        .filter(|m| m.role == ChatRole::User)
        .map(|m| m.content.as_str())
        .collect();
    assert!(users == ["first", "second"] || users == ["second", "first"]);
}

#[tokio::test]
async fn different_users_run_in_parallel() {
    let adapter = SlowAdapter::new(Duration::from_millis(200));
    let orchestrator = orchestrator(adapter.clone());

    let a = {
        let o = Arc::clone(&orchestrator);
        tokio::spawn(async move { o.reply("u1", "hi").await })
    };
    let b = {
        let o = Arc::clone(&orchestrator);
        tokio::spawn(async move { o.reply("u2", "hi").await })
    };
    a.await.unwrap();
    b.await.unwrap();

    assert_eq!(adapter.max_in_flight.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn worker_pool_bounds_parallelism() {
    let adapter = SlowAdapter::new(Duration::from_millis(100));

    let registry = Arc::new(ModelRegistry::new(
        Arc::new(SlowFactory {
            adapter: adapter.clone(),
        }),
        RegistrySettings::default(),
    ));
    registry.refresh(vec![descriptor("alpha")], "alpha");
    let orchestrator = Arc::new(ConversationOrchestrator::new(
        registry,
        InMemoryPreferences::new(),
        vec![],
        OrchestratorSettings {
            max_concurrent_replies: 2,
            ..Default::default()
        },
    ));

    let mut handles = Vec::new();
    for i in 0..6 {
        let o = Arc::clone(&orchestrator);
        handles.push(tokio::spawn(
            async move { o.reply(&format!("user-{i}"), "hi").await },
        ));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), vec!["pong"]);
    }

    assert!(adapter.max_in_flight.load(Ordering::SeqCst) <= 2);
}
