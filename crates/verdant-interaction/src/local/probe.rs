//! Capability probe for the on-device language model.

use super::model::{Availability, LocalLanguageModel};

/// Returns true only when the local model is ready immediately.
///
/// Download-required and unavailable tiers both count as false; the probe
/// never triggers a download and never fails. The orchestrator caches the
/// result for the session and re-probes on connectivity changes, since
/// local availability and network mode are independent axes.
pub async fn probe_local_model(model: &dyn LocalLanguageModel) -> bool {
    match model.availability().await {
        Availability::Ready => true,
        tier => {
            tracing::debug!(?tier, "local model not immediately available");
            false
        }
    }
}
