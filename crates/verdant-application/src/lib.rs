//! Application services for Verdant.
//!
//! Composes the boundary providers from `verdant-interaction` into the
//! identification service, the conversation service, and the orchestrator
//! that selects between them.

pub mod conversation;
pub mod identification;
pub mod orchestrator;

pub use conversation::{
    CHAT_EMPTY_FALLBACK, ChatRoute, CloudChat, ConversationService, LOCAL_FAILED_OFFLINE,
    OFFLINE_UNAVAILABLE, select_chat_route,
};
pub use identification::{CloudIdentification, IdentifyStrategy, LocalIdentification};
pub use orchestrator::{IdentifyState, Orchestrator};
