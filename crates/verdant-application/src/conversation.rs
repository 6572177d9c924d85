//! Conversation service.
//!
//! Routes each chat turn to the on-device model or the cloud provider and
//! owns the single long-lived local session. The policy is fast-local-first:
//! a ready local model is preferred even when online, with a one-shot cloud
//! fallback when a local turn fails and connectivity exists.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use verdant_core::conversation::ConversationTurn;
use verdant_core::{PlantRecord, RequestContext, VerdantError};
use verdant_interaction::GeminiClient;
use verdant_interaction::local::{LocalLanguageModel, LocalSession};

/// Designed UX fallback when the cloud provider returns empty chat text.
pub const CHAT_EMPTY_FALLBACK: &str = "I'm sorry, I couldn't generate a response.";

/// Shown when neither the local model nor connectivity is available.
pub const OFFLINE_UNAVAILABLE: &str =
    "I'm offline right now and can't answer. Please reconnect to the internet to keep chatting.";

/// Shown when a local turn fails and there is no connectivity to fall
/// back on.
pub const LOCAL_FAILED_OFFLINE: &str =
    "I'm sorry, I couldn't answer on-device. Please reconnect to the internet and try again.";

const PERSONA: &str = "You are Verdant, a friendly and knowledgeable plant-care assistant. \
    Keep answers practical and concise.";

/// Which backend should answer a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRoute {
    Local,
    Cloud,
    Offline,
}

/// Selects the backend for one turn, evaluated fresh per request.
///
/// Local is preferred over cloud whenever it is ready, regardless of
/// connectivity; cloud is the online fallback, and without either the
/// turn gets a static offline message.
pub fn select_chat_route(ctx: &RequestContext) -> ChatRoute {
    if ctx.is_local_model_ready {
        ChatRoute::Local
    } else if ctx.is_online {
        ChatRoute::Cloud
    } else {
        ChatRoute::Offline
    }
}

/// Cloud chat boundary, implemented by [`GeminiClient`].
#[async_trait]
pub trait CloudChat: Send + Sync {
    async fn chat(
        &self,
        system_instruction: &str,
        history: &[ConversationTurn],
        new_message: &str,
    ) -> Result<String, VerdantError>;
}

#[async_trait]
impl CloudChat for GeminiClient {
    async fn chat(
        &self,
        system_instruction: &str,
        history: &[ConversationTurn],
        new_message: &str,
    ) -> Result<String, VerdantError> {
        GeminiClient::chat(self, system_instruction, history, new_message).await
    }
}

/// The one live local session, tagged with the plant it was seeded for.
struct ActiveLocalSession {
    session: Box<dyn LocalSession>,
    fingerprint: Option<String>,
}

impl Drop for ActiveLocalSession {
    fn drop(&mut self) {
        self.session.destroy();
    }
}

/// Per-conversation service owning the local session lifecycle.
pub struct ConversationService {
    cloud: Arc<dyn CloudChat>,
    local_model: Arc<dyn LocalLanguageModel>,
    /// At most one session is alive at a time; the mutex also serializes
    /// access so no two turns share it concurrently.
    local_session: Mutex<Option<ActiveLocalSession>>,
}

impl ConversationService {
    pub fn new(cloud: Arc<dyn CloudChat>, local_model: Arc<dyn LocalLanguageModel>) -> Self {
        Self {
            cloud,
            local_model,
            local_session: Mutex::new(None),
        }
    }

    /// Produces the next assistant reply for `new_message`.
    ///
    /// `history` is the full prior turn sequence, excluding the message
    /// being sent, replayed as-is on the cloud path. The local path sends
    /// only the new message; its context lives in the session.
    pub async fn send(
        &self,
        ctx: &RequestContext,
        history: &[ConversationTurn],
        new_message: &str,
    ) -> Result<String, VerdantError> {
        match select_chat_route(ctx) {
            ChatRoute::Offline => Ok(OFFLINE_UNAVAILABLE.to_string()),
            ChatRoute::Cloud => self.send_cloud(ctx, history, new_message).await,
            ChatRoute::Local => match self.send_local(ctx, new_message).await {
                Ok(reply) => Ok(reply),
                Err(err) if ctx.is_online => {
                    // Single fallback for this message only; which backend
                    // answered is not surfaced to the user.
                    tracing::warn!(error = %err, "local chat failed, falling back to cloud");
                    self.send_cloud(ctx, history, new_message).await
                }
                Err(err) => {
                    tracing::warn!(error = %err, "local chat failed with no connectivity");
                    Ok(LOCAL_FAILED_OFFLINE.to_string())
                }
            },
        }
    }

    /// Releases the local session. Called on conversation teardown and on
    /// reset; safe when no session exists.
    pub async fn teardown(&self) {
        self.local_session.lock().await.take();
    }

    async fn send_cloud(
        &self,
        ctx: &RequestContext,
        history: &[ConversationTurn],
        new_message: &str,
    ) -> Result<String, VerdantError> {
        let instruction = cloud_system_instruction(ctx.plant_context.as_ref());
        match self.cloud.chat(&instruction, history, new_message).await {
            Ok(reply) => Ok(reply),
            // Empty cloud chat text is a designed UX fallback, not an error.
            Err(VerdantError::EmptyResponse) => Ok(CHAT_EMPTY_FALLBACK.to_string()),
            Err(err) => Err(err),
        }
    }

    async fn send_local(
        &self,
        ctx: &RequestContext,
        new_message: &str,
    ) -> Result<String, VerdantError> {
        let fingerprint = ctx
            .plant_context
            .as_ref()
            .map(PlantRecord::context_fingerprint);

        let mut slot = self.local_session.lock().await;

        // A new plant context invalidates the old session; dropping it
        // destroys it before the replacement is created.
        if slot
            .as_ref()
            .is_some_and(|active| active.fingerprint != fingerprint)
        {
            slot.take();
        }

        if slot.is_none() {
            let instruction = local_system_instruction(ctx.plant_context.as_ref());
            let session = self.local_model.create_session(&instruction).await?;
            *slot = Some(ActiveLocalSession {
                session,
                fingerprint,
            });
        }

        let active = slot.as_mut().expect("session was just ensured");
        match active.session.prompt(new_message).await {
            Ok(reply) => Ok(reply),
            Err(err) => {
                // Release on the error path too; the next turn starts fresh.
                slot.take();
                Err(err)
            }
        }
    }
}

/// Full-record system instruction for the cloud path.
///
/// Embedding the current record lets the assistant answer plant-specific
/// questions without re-sending the image.
pub(crate) fn cloud_system_instruction(plant: Option<&PlantRecord>) -> String {
    match plant {
        Some(plant) => format!(
            "{PERSONA}\n\nThe user is currently looking at this plant:\n{}",
            serde_json::to_string_pretty(plant).unwrap_or_default()
        ),
        None => PERSONA.to_string(),
    }
}

/// Reduced system instruction for the local path.
///
/// Local models run with tighter context budgets, so only the description,
/// water and light care, and pet-safety make the cut.
pub(crate) fn local_system_instruction(plant: Option<&PlantRecord>) -> String {
    match plant {
        Some(plant) => format!(
            "{PERSONA}\nThe user's plant: {} ({}). {}\nWater: {}\nLight: {}\nSafe for pets: {}",
            plant.common_name,
            plant.scientific_name,
            plant.description,
            plant.care.water,
            plant.care.light,
            if plant.pet_friendly { "yes" } else { "no" }
        ),
        None => PERSONA.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use verdant_core::CareInstructions;
    use verdant_interaction::local::Availability;

    fn snake_plant() -> PlantRecord {
        PlantRecord {
            common_name: "Snake Plant".to_string(),
            scientific_name: "Dracaena trifasciata".to_string(),
            description: "A hardy succulent with upright leaves.".to_string(),
            care: CareInstructions {
                water: "Every 2-3 weeks".to_string(),
                light: "Indirect sun".to_string(),
                soil: "Cactus mix".to_string(),
                humidity: "Average".to_string(),
                temperature: "18-27 C".to_string(),
            },
            pet_friendly: false,
            fun_fact: "Studied by NASA.".to_string(),
        }
    }

    struct FakeCloud {
        reply: Result<String, VerdantError>,
        calls: AtomicUsize,
    }

    impl FakeCloud {
        fn new(reply: Result<String, VerdantError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CloudChat for FakeCloud {
        async fn chat(
            &self,
            _system_instruction: &str,
            _history: &[ConversationTurn],
            _new_message: &str,
        ) -> Result<String, VerdantError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    struct FakeSession {
        reply: Result<String, VerdantError>,
        destroys: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LocalSession for FakeSession {
        async fn prompt(&mut self, _text: &str) -> Result<String, VerdantError> {
            self.reply.clone()
        }

        fn destroy(&mut self) {
            self.destroys.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeLocalModel {
        reply: Result<String, VerdantError>,
        sessions_created: Arc<AtomicUsize>,
        destroys: Arc<AtomicUsize>,
    }

    impl FakeLocalModel {
        fn new(reply: Result<String, VerdantError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                sessions_created: Arc::new(AtomicUsize::new(0)),
                destroys: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    #[async_trait]
    impl LocalLanguageModel for FakeLocalModel {
        async fn availability(&self) -> Availability {
            Availability::Ready
        }

        async fn create_session(
            &self,
            _system_instruction: &str,
        ) -> Result<Box<dyn LocalSession>, VerdantError> {
            self.sessions_created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSession {
                reply: self.reply.clone(),
                destroys: self.destroys.clone(),
            }))
        }
    }

    fn ctx(online: bool, local_ready: bool) -> RequestContext {
        RequestContext::new(online, local_ready)
    }

    #[test]
    fn test_route_prefers_local_even_when_online() {
        assert_eq!(select_chat_route(&ctx(true, true)), ChatRoute::Local);
        assert_eq!(select_chat_route(&ctx(false, true)), ChatRoute::Local);
        assert_eq!(select_chat_route(&ctx(true, false)), ChatRoute::Cloud);
        assert_eq!(select_chat_route(&ctx(false, false)), ChatRoute::Offline);
    }

    #[tokio::test]
    async fn test_local_ready_never_touches_cloud() {
        let cloud = FakeCloud::new(Ok("cloud reply".to_string()));
        let local = FakeLocalModel::new(Ok("local reply".to_string()));
        let service = ConversationService::new(cloud.clone(), local);

        let reply = service.send(&ctx(true, true), &[], "hello").await.unwrap();
        assert_eq!(reply, "local reply");
        assert_eq!(cloud.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_local_failure_online_falls_back_to_cloud_once() {
        let cloud = FakeCloud::new(Ok("cloud reply".to_string()));
        let local = FakeLocalModel::new(Err(VerdantError::local_generation("boom")));
        let service = ConversationService::new(cloud.clone(), local);

        let reply = service.send(&ctx(true, true), &[], "hello").await.unwrap();
        assert_eq!(reply, "cloud reply");
        assert_eq!(cloud.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_local_failure_offline_returns_reconnect_apology() {
        let cloud = FakeCloud::new(Ok("cloud reply".to_string()));
        let local = FakeLocalModel::new(Err(VerdantError::local_generation("boom")));
        let service = ConversationService::new(cloud.clone(), local);

        let reply = service.send(&ctx(false, true), &[], "hello").await.unwrap();
        assert_eq!(reply, LOCAL_FAILED_OFFLINE);
        assert_eq!(cloud.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_backend_at_all_returns_offline_message() {
        let cloud = FakeCloud::new(Ok("cloud reply".to_string()));
        let local = FakeLocalModel::new(Ok("local reply".to_string()));
        let service = ConversationService::new(cloud.clone(), local);

        let reply = service.send(&ctx(false, false), &[], "hello").await.unwrap();
        assert_eq!(reply, OFFLINE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_empty_cloud_reply_becomes_designed_fallback() {
        let cloud = FakeCloud::new(Err(VerdantError::EmptyResponse));
        let local = FakeLocalModel::new(Ok("unused".to_string()));
        let service = ConversationService::new(cloud, local);

        let reply = service.send(&ctx(true, false), &[], "hello").await.unwrap();
        assert_eq!(reply, CHAT_EMPTY_FALLBACK);
    }

    #[tokio::test]
    async fn test_cloud_provider_error_propagates() {
        let cloud = FakeCloud::new(Err(VerdantError::provider_status(500, "down")));
        let local = FakeLocalModel::new(Ok("unused".to_string()));
        let service = ConversationService::new(cloud, local);

        let err = service
            .send(&ctx(true, false), &[], "hello")
            .await
            .unwrap_err();
        assert_eq!(err, VerdantError::provider_status(500, "down"));
    }

    #[tokio::test]
    async fn test_session_reused_for_same_plant() {
        let cloud = FakeCloud::new(Ok("cloud".to_string()));
        let local = FakeLocalModel::new(Ok("local".to_string()));
        let created = local.sessions_created.clone();
        let service = ConversationService::new(cloud, local);

        let ctx = ctx(true, true).with_plant(snake_plant());
        service.send(&ctx, &[], "one").await.unwrap();
        service.send(&ctx, &[], "two").await.unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_session_recreated_when_plant_changes() {
        let cloud = FakeCloud::new(Ok("cloud".to_string()));
        let local = FakeLocalModel::new(Ok("local".to_string()));
        let created = local.sessions_created.clone();
        let destroys = local.destroys.clone();
        let service = ConversationService::new(cloud, local);

        let first = ctx(true, true).with_plant(snake_plant());
        let mut other_plant = snake_plant();
        other_plant.common_name = "Rose".to_string();
        other_plant.scientific_name = "Rosa".to_string();
        let second = ctx(true, true).with_plant(other_plant);

        service.send(&first, &[], "one").await.unwrap();
        service.send(&second, &[], "two").await.unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 2);
        assert_eq!(destroys.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_teardown_destroys_live_session() {
        let cloud = FakeCloud::new(Ok("cloud".to_string()));
        let local = FakeLocalModel::new(Ok("local".to_string()));
        let destroys = local.destroys.clone();
        let service = ConversationService::new(cloud, local);

        service.send(&ctx(true, true), &[], "one").await.unwrap();
        service.teardown().await;
        assert_eq!(destroys.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cloud_instruction_embeds_full_record() {
        let instruction = cloud_system_instruction(Some(&snake_plant()));
        assert!(instruction.contains("Snake Plant"));
        assert!(instruction.contains("Cactus mix"));
        assert!(instruction.contains("18-27 C"));
    }

    #[test]
    fn test_local_instruction_is_reduced() {
        let instruction = local_system_instruction(Some(&snake_plant()));
        assert!(instruction.contains("Every 2-3 weeks"));
        assert!(instruction.contains("Indirect sun"));
        assert!(instruction.contains("Safe for pets: no"));
        assert!(!instruction.contains("Cactus mix"));
        assert!(!instruction.contains("NASA"));
    }

    #[test]
    fn test_instructions_without_context_are_persona_only() {
        assert_eq!(cloud_system_instruction(None), PERSONA);
        assert_eq!(local_system_instruction(None), PERSONA);
    }
}
