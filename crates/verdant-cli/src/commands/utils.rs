//! Shared command plumbing: config resolution and stack assembly.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use verdant_application::{
    CloudIdentification, ConversationService, LocalIdentification, Orchestrator,
};
use verdant_core::{ProviderConfig, SecretStore, VerdantError};
use verdant_interaction::classifier::{
    ClassifierBackend, CommandClassifier, UnconfiguredClassifier,
};
use verdant_interaction::{EnvSecretStore, GeminiClient, OllamaModel, VisionClassifier};

/// Resolves the config file path: explicit flag, else the platform config
/// directory.
fn config_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("verdant")
            .join("config.toml"),
    }
}

pub fn load_config(explicit: Option<&Path>) -> Result<ProviderConfig> {
    Ok(ProviderConfig::load(&config_path(explicit))?)
}

/// Assembles the full orchestration stack.
///
/// The API key is required up front only when the session starts online;
/// in offline mode the cloud client exists but is never selected, and the
/// missing-key error would only surface if a call were attempted.
pub async fn build_orchestrator(offline: bool, config: &ProviderConfig) -> Result<Orchestrator> {
    let secrets = EnvSecretStore::default();
    let api_key = match secrets.gemini_api_key().await {
        Ok(key) => key,
        Err(VerdantError::Configuration(message)) if offline => {
            tracing::debug!(%message, "starting without cloud credentials");
            String::new()
        }
        Err(err) => return Err(err.into()),
    };
    let cloud = Arc::new(GeminiClient::new(api_key, config.cloud_model.clone()));

    let backend: Arc<dyn ClassifierBackend> = match &config.classifier_command {
        Some(command) => Arc::new(CommandClassifier::new(command)),
        None => Arc::new(UnconfiguredClassifier),
    };
    let classifier = Arc::new(VisionClassifier::new(backend, config));
    classifier.ensure_loaded().await?;

    let local_model = Arc::new(OllamaModel::new(config.local_model.clone()));
    let conversation = Arc::new(ConversationService::new(cloud.clone(), local_model.clone()));

    let orchestrator = Orchestrator::new(
        Arc::new(CloudIdentification::new(cloud)),
        Arc::new(LocalIdentification::new(local_model.clone())),
        classifier,
        conversation,
        local_model,
    );
    orchestrator.set_online(!offline).await;
    Ok(orchestrator)
}

/// Renders an identification result as a card.
pub fn print_record(record: &verdant_core::PlantRecord) {
    println!("{} ({})", record.common_name, record.scientific_name);
    println!("{}", record.description);
    println!();
    println!("Care:");
    println!("  water:       {}", record.care.water);
    println!("  light:       {}", record.care.light);
    println!("  soil:        {}", record.care.soil);
    println!("  humidity:    {}", record.care.humidity);
    println!("  temperature: {}", record.care.temperature);
    println!();
    println!(
        "Pet friendly: {}",
        if record.pet_friendly { "yes" } else { "no" }
    );
    println!("Fun fact: {}", record.fun_fact);
}
