//! Orchestrator and mode policy.
//!
//! Observes connectivity and capability signals, selects which strategy
//! serves each request, and owns the per-request state machine. All
//! provider calls are awaited sequentially; there is no fan-out and no
//! race between cloud and local.

use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use verdant_core::{IdentifySource, PlantRecord, RequestContext, Transcript, VerdantError};
use verdant_interaction::VisionClassifier;
use verdant_interaction::local::{LocalLanguageModel, probe_local_model};

use crate::conversation::ConversationService;
use crate::identification::IdentifyStrategy;

/// State machine for one identification request.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum IdentifyState {
    #[default]
    Idle,
    Analyzing,
    Success(PlantRecord),
    Failure(VerdantError),
}

/// Process-wide session state, updated by connectivity events at any time.
#[derive(Debug, Clone, Default)]
struct SessionState {
    is_online: bool,
    is_local_model_ready: bool,
    active_plant: Option<PlantRecord>,
}

/// Coordinates identification and chat across the available backends.
///
/// Selection rules, evaluated at request time from a fresh snapshot:
/// identification uses the cloud strategy whenever the device is online and
/// the classify-then-generate pipeline otherwise; chat prefers the local
/// model whenever it is ready (the zero-latency path), then the cloud, then
/// a static offline message.
pub struct Orchestrator {
    cloud_identify: Arc<dyn IdentifyStrategy>,
    local_identify: Arc<dyn IdentifyStrategy>,
    classifier: Arc<VisionClassifier>,
    conversation: Arc<ConversationService>,
    local_model: Arc<dyn LocalLanguageModel>,
    state: RwLock<SessionState>,
    identify_state: RwLock<IdentifyState>,
    /// Busy flags: a second request of the same kind is refused, not queued.
    identify_busy: Mutex<()>,
    chat_busy: Mutex<()>,
}

impl Orchestrator {
    pub fn new(
        cloud_identify: Arc<dyn IdentifyStrategy>,
        local_identify: Arc<dyn IdentifyStrategy>,
        classifier: Arc<VisionClassifier>,
        conversation: Arc<ConversationService>,
        local_model: Arc<dyn LocalLanguageModel>,
    ) -> Self {
        Self {
            cloud_identify,
            local_identify,
            classifier,
            conversation,
            local_model,
            state: RwLock::new(SessionState::default()),
            identify_state: RwLock::new(IdentifyState::Idle),
            identify_busy: Mutex::new(()),
            chat_busy: Mutex::new(()),
        }
    }

    /// Consumes a host connectivity event.
    ///
    /// Local-model availability and network mode are independent axes, so
    /// every transition re-runs the capability probe. An in-flight request
    /// is not cancelled; it finishes against the snapshot it started with.
    pub async fn set_online(&self, online: bool) {
        let ready = probe_local_model(self.local_model.as_ref()).await;
        let mut state = self.state.write().await;
        state.is_online = online;
        state.is_local_model_ready = ready;
        tracing::debug!(online, local_ready = ready, "session state updated");
    }

    /// Re-runs the capability probe without a connectivity change.
    pub async fn refresh_capability(&self) -> bool {
        let ready = probe_local_model(self.local_model.as_ref()).await;
        self.state.write().await.is_local_model_ready = ready;
        ready
    }

    /// Snapshot of session state for one request.
    pub async fn context(&self) -> RequestContext {
        let state = self.state.read().await;
        RequestContext {
            is_online: state.is_online,
            is_local_model_ready: state.is_local_model_ready,
            plant_context: state.active_plant.clone(),
        }
    }

    /// Current identification request state.
    pub async fn identify_state(&self) -> IdentifyState {
        self.identify_state.read().await.clone()
    }

    /// The most recently identified plant, if any.
    pub async fn active_plant(&self) -> Option<PlantRecord> {
        self.state.read().await.active_plant.clone()
    }

    /// Runs one identification request against the selected strategy.
    ///
    /// On success the record replaces any prior one and becomes the chat
    /// grounding context. Failures land in `IdentifyState::Failure`
    /// untransformed.
    pub async fn identify(
        &self,
        image: Vec<u8>,
        mime_type: String,
    ) -> Result<PlantRecord, VerdantError> {
        let _busy = self
            .identify_busy
            .try_lock()
            .map_err(|_| VerdantError::busy("identification"))?;

        *self.identify_state.write().await = IdentifyState::Analyzing;
        let ctx = self.context().await;

        let result = self.run_identification(&ctx, image, mime_type).await;
        match &result {
            Ok(record) => {
                self.state.write().await.active_plant = Some(record.clone());
                *self.identify_state.write().await = IdentifyState::Success(record.clone());
            }
            Err(err) => {
                *self.identify_state.write().await = IdentifyState::Failure(err.clone());
            }
        }
        result
    }

    async fn run_identification(
        &self,
        ctx: &RequestContext,
        image: Vec<u8>,
        mime_type: String,
    ) -> Result<PlantRecord, VerdantError> {
        if ctx.is_online {
            tracing::debug!(strategy = self.cloud_identify.name(), "identifying");
            self.cloud_identify
                .identify(IdentifySource::image(image, mime_type))
                .await
        } else {
            tracing::debug!(strategy = self.local_identify.name(), "identifying");
            // Empty labels flow into the local strategy, which raises
            // NoObjectDetected before any generation runs.
            let labels = self.classifier.classify(&image).await?;
            self.local_identify
                .identify(IdentifySource::labels(labels))
                .await
        }
    }

    /// Sends one chat turn, appending the user message and exactly one
    /// assistant reply to `transcript`.
    pub async fn chat_turn(
        &self,
        transcript: &mut Transcript,
        message: &str,
    ) -> Result<String, VerdantError> {
        let _busy = self
            .chat_busy
            .try_lock()
            .map_err(|_| VerdantError::busy("chat"))?;

        let ctx = self.context().await;
        let reply = self
            .conversation
            .send(&ctx, transcript.history(), message)
            .await?;

        transcript.push_user(message);
        transcript.push_model(reply.clone());
        Ok(reply)
    }

    /// Clears the identified plant, the chat session, and request state.
    pub async fn reset(&self) {
        self.conversation.teardown().await;
        let mut state = self.state.write().await;
        state.active_plant = None;
        drop(state);
        *self.identify_state.write().await = IdentifyState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use verdant_core::{CareInstructions, ProviderConfig};
    use verdant_interaction::classifier::{ClassifierBackend, LabelScore};
    use verdant_interaction::local::{Availability, LocalSession};

    use crate::conversation::CloudChat;
    use verdant_core::conversation::ConversationTurn;

    fn rose() -> PlantRecord {
        PlantRecord {
            common_name: "Rose".to_string(),
            scientific_name: "Rosa".to_string(),
            description: "A woody perennial.".to_string(),
            care: CareInstructions {
                water: "Weekly".to_string(),
                light: "Full sun".to_string(),
                soil: "Loam".to_string(),
                humidity: "Moderate".to_string(),
                temperature: "15-26 C".to_string(),
            },
            pet_friendly: true,
            fun_fact: "Rose hips are edible.".to_string(),
        }
    }

    struct FakeStrategy {
        record: Result<PlantRecord, VerdantError>,
        calls: Arc<AtomicUsize>,
        delay: Option<Duration>,
        strategy_name: &'static str,
    }

    impl FakeStrategy {
        fn new(name: &'static str, record: Result<PlantRecord, VerdantError>) -> Arc<Self> {
            Arc::new(Self {
                record,
                calls: Arc::new(AtomicUsize::new(0)),
                delay: None,
                strategy_name: name,
            })
        }

        fn slow(name: &'static str, record: PlantRecord, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                record: Ok(record),
                calls: Arc::new(AtomicUsize::new(0)),
                delay: Some(delay),
                strategy_name: name,
            })
        }
    }

    #[async_trait]
    impl IdentifyStrategy for FakeStrategy {
        async fn identify(&self, _source: IdentifySource) -> Result<PlantRecord, VerdantError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.record.clone()
        }

        fn name(&self) -> &'static str {
            self.strategy_name
        }
    }

    struct FakeBackend {
        scores: Vec<LabelScore>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ClassifierBackend for FakeBackend {
        async fn ensure_loaded(&self) -> Result<(), VerdantError> {
            Ok(())
        }

        fn is_loaded(&self) -> bool {
            true
        }

        async fn classify(
            &self,
            _image: &[u8],
            max_results: usize,
        ) -> Result<Vec<LabelScore>, VerdantError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut scores = self.scores.clone();
            scores.truncate(max_results);
            Ok(scores)
        }
    }

    struct FakeCloudChat;

    #[async_trait]
    impl CloudChat for FakeCloudChat {
        async fn chat(
            &self,
            _system_instruction: &str,
            _history: &[ConversationTurn],
            _new_message: &str,
        ) -> Result<String, VerdantError> {
            Ok("cloud reply".to_string())
        }
    }

    struct FakeLocalModel {
        availability: Availability,
        availability_calls: Arc<AtomicUsize>,
    }

    impl FakeLocalModel {
        fn new(availability: Availability) -> Arc<Self> {
            Arc::new(Self {
                availability,
                availability_calls: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    #[async_trait]
    impl LocalLanguageModel for FakeLocalModel {
        async fn availability(&self) -> Availability {
            self.availability_calls.fetch_add(1, Ordering::SeqCst);
            self.availability
        }

        async fn create_session(
            &self,
            _system_instruction: &str,
        ) -> Result<Box<dyn LocalSession>, VerdantError> {
            Err(VerdantError::local_generation("no sessions in this fake"))
        }
    }

    struct Fixture {
        orchestrator: Orchestrator,
        cloud_calls: Arc<AtomicUsize>,
        local_calls: Arc<AtomicUsize>,
        classifier_calls: Arc<AtomicUsize>,
    }

    fn fixture(
        cloud: Arc<FakeStrategy>,
        local: Arc<FakeStrategy>,
        scores: Vec<LabelScore>,
    ) -> Fixture {
        let classifier_calls = Arc::new(AtomicUsize::new(0));
        let backend = Arc::new(FakeBackend {
            scores,
            calls: classifier_calls.clone(),
        });
        let classifier = Arc::new(VisionClassifier::new(backend, &ProviderConfig::default()));
        let local_model = FakeLocalModel::new(Availability::Ready);
        let conversation = Arc::new(ConversationService::new(
            Arc::new(FakeCloudChat),
            local_model.clone(),
        ));
        let cloud_calls = cloud.calls.clone();
        let local_calls = local.calls.clone();
        Fixture {
            orchestrator: Orchestrator::new(cloud, local, classifier, conversation, local_model),
            cloud_calls,
            local_calls,
            classifier_calls,
        }
    }

    fn score(label: &str, confidence: f32) -> LabelScore {
        LabelScore {
            label: label.to_string(),
            confidence,
        }
    }

    #[tokio::test]
    async fn test_online_uses_cloud_strategy_only() {
        let fx = fixture(
            FakeStrategy::new("cloud", Ok(rose())),
            FakeStrategy::new("local", Ok(rose())),
            vec![score("rose", 0.9)],
        );
        fx.orchestrator.set_online(true).await;

        fx.orchestrator
            .identify(vec![1, 2, 3], "image/jpeg".to_string())
            .await
            .unwrap();
        assert_eq!(fx.cloud_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fx.local_calls.load(Ordering::SeqCst), 0);
        assert_eq!(fx.classifier_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_offline_runs_classify_then_local() {
        let fx = fixture(
            FakeStrategy::new("cloud", Ok(rose())),
            FakeStrategy::new("local", Ok(rose())),
            vec![score("rose", 0.9)],
        );
        fx.orchestrator.set_online(false).await;

        fx.orchestrator
            .identify(vec![1, 2, 3], "image/jpeg".to_string())
            .await
            .unwrap();
        assert_eq!(fx.cloud_calls.load(Ordering::SeqCst), 0);
        assert_eq!(fx.local_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fx.classifier_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_sets_state_and_plant_context() {
        let fx = fixture(
            FakeStrategy::new("cloud", Ok(rose())),
            FakeStrategy::new("local", Ok(rose())),
            vec![],
        );
        fx.orchestrator.set_online(true).await;

        fx.orchestrator
            .identify(vec![0], "image/png".to_string())
            .await
            .unwrap();
        assert_eq!(
            fx.orchestrator.identify_state().await,
            IdentifyState::Success(rose())
        );
        assert_eq!(fx.orchestrator.active_plant().await, Some(rose()));
    }

    #[tokio::test]
    async fn test_failure_sets_failure_state_verbatim() {
        let err = VerdantError::provider_status(500, "down");
        let fx = fixture(
            FakeStrategy::new("cloud", Err(err.clone())),
            FakeStrategy::new("local", Ok(rose())),
            vec![],
        );
        fx.orchestrator.set_online(true).await;

        let got = fx
            .orchestrator
            .identify(vec![0], "image/png".to_string())
            .await
            .unwrap_err();
        assert_eq!(got, err);
        assert_eq!(
            fx.orchestrator.identify_state().await,
            IdentifyState::Failure(err)
        );
        assert!(fx.orchestrator.active_plant().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_second_identification_is_refused_while_busy() {
        let fx = fixture(
            FakeStrategy::slow("cloud", rose(), Duration::from_millis(200)),
            FakeStrategy::new("local", Ok(rose())),
            vec![],
        );
        fx.orchestrator.set_online(true).await;
        let orchestrator = Arc::new(fx.orchestrator);

        let first = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(
                async move { orchestrator.identify(vec![0], "image/png".to_string()).await },
            )
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = orchestrator.identify(vec![0], "image/png".to_string()).await;
        assert_eq!(second.unwrap_err(), VerdantError::busy("identification"));

        first.await.unwrap().unwrap();
        assert_eq!(fx.cloud_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connectivity_change_reprobes_capability() {
        let fx = fixture(
            FakeStrategy::new("cloud", Ok(rose())),
            FakeStrategy::new("local", Ok(rose())),
            vec![],
        );
        let before = fx.orchestrator.context().await;
        assert!(!before.is_local_model_ready);

        fx.orchestrator.set_online(true).await;
        let after = fx.orchestrator.context().await;
        assert!(after.is_local_model_ready);

        fx.orchestrator.set_online(false).await;
        let offline = fx.orchestrator.context().await;
        assert!(!offline.is_online);
        // Probe ran again on the second transition too.
        assert!(offline.is_local_model_ready);
    }

    #[tokio::test]
    async fn test_chat_turn_appends_one_user_and_one_model_turn() {
        let fx = fixture(
            FakeStrategy::new("cloud", Ok(rose())),
            FakeStrategy::new("local", Ok(rose())),
            vec![],
        );
        fx.orchestrator.set_online(true).await;
        // Local model in this fixture cannot create sessions, so the cloud
        // route answers after the logged fallback.
        let mut transcript = Transcript::with_greeting(None);

        let reply = fx
            .orchestrator
            .chat_turn(&mut transcript, "Is it thirsty?")
            .await
            .unwrap();
        assert_eq!(reply, "cloud reply");
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.turns()[1].text, "Is it thirsty?");
        assert_eq!(transcript.turns()[2].text, "cloud reply");
    }

    #[tokio::test]
    async fn test_reset_clears_plant_and_state() {
        let fx = fixture(
            FakeStrategy::new("cloud", Ok(rose())),
            FakeStrategy::new("local", Ok(rose())),
            vec![],
        );
        fx.orchestrator.set_online(true).await;
        fx.orchestrator
            .identify(vec![0], "image/png".to_string())
            .await
            .unwrap();

        fx.orchestrator.reset().await;
        assert!(fx.orchestrator.active_plant().await.is_none());
        assert_eq!(fx.orchestrator.identify_state().await, IdentifyState::Idle);
    }
}
