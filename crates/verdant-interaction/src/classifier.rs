//! Vision classifier adapter for the offline identification pipeline.
//!
//! The backend produces ranked `(label, confidence)` guesses after a
//! one-time asynchronous model-asset load. The adapter trims to top-K,
//! drops guesses below the confidence floor, and turns "nothing cleared
//! the floor" into an empty list rather than an error — the caller treats
//! empty as a distinct could-not-identify outcome.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::process::Command;
use verdant_core::{ProviderConfig, VerdantError};

/// One ranked guess from the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub confidence: f32,
}

/// Raw classifier implementation boundary.
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Completes the one-time model-asset load. Safe to call repeatedly.
    async fn ensure_loaded(&self) -> Result<(), VerdantError>;

    /// True once `ensure_loaded` has completed successfully.
    fn is_loaded(&self) -> bool;

    /// Returns up to `max_results` guesses, most confident first.
    async fn classify(
        &self,
        image: &[u8],
        max_results: usize,
    ) -> Result<Vec<LabelScore>, VerdantError>;
}

/// Adapter enforcing top-K and the confidence floor.
pub struct VisionClassifier {
    backend: Arc<dyn ClassifierBackend>,
    top_k: usize,
    confidence_floor: f32,
}

impl VisionClassifier {
    pub fn new(backend: Arc<dyn ClassifierBackend>, config: &ProviderConfig) -> Self {
        Self {
            backend,
            top_k: config.classifier_top_k,
            confidence_floor: config.confidence_floor,
        }
    }

    /// Runs the backend's one-time initialization.
    pub async fn ensure_loaded(&self) -> Result<(), VerdantError> {
        self.backend.ensure_loaded().await
    }

    /// Classifies an image into at most top-K label strings.
    ///
    /// Fails with `ModelNotLoaded` when called before initialization has
    /// completed; callers treat that as a retryable precondition. An empty
    /// result is not an error.
    pub async fn classify(&self, image: &[u8]) -> Result<Vec<String>, VerdantError> {
        if !self.backend.is_loaded() {
            return Err(VerdantError::ModelNotLoaded);
        }

        let mut scores = self.backend.classify(image, self.top_k).await?;
        scores.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(scores
            .into_iter()
            .filter(|score| score.confidence >= self.confidence_floor)
            .take(self.top_k)
            .map(|score| score.label)
            .collect())
    }
}

/// Backend invoking an external classifier command.
///
/// The command receives the image path as its only argument and prints one
/// `label<TAB>confidence` line per guess on stdout.
pub struct CommandClassifier {
    command: PathBuf,
    loaded: AtomicBool,
}

impl CommandClassifier {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            loaded: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ClassifierBackend for CommandClassifier {
    async fn ensure_loaded(&self) -> Result<(), VerdantError> {
        tokio::fs::metadata(&self.command).await.map_err(|_| {
            VerdantError::local_generation(format!(
                "classifier command not found: {}",
                self.command.display()
            ))
        })?;
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    async fn classify(
        &self,
        image: &[u8],
        max_results: usize,
    ) -> Result<Vec<LabelScore>, VerdantError> {
        let image_path =
            std::env::temp_dir().join(format!("verdant-classify-{}.img", uuid::Uuid::new_v4()));
        tokio::fs::write(&image_path, image).await.map_err(|err| {
            VerdantError::local_generation(format!("failed to stage image: {err}"))
        })?;

        let result = Command::new(&self.command)
            .arg(&image_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;
        // The staged image is temporary regardless of the outcome.
        let _ = tokio::fs::remove_file(&image_path).await;

        let output = result.map_err(|err| {
            VerdantError::local_generation(format!("classifier failed to start: {err}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VerdantError::local_generation(format!(
                "classifier exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let mut scores = parse_scores(&String::from_utf8_lossy(&output.stdout));
        scores.truncate(max_results);
        Ok(scores)
    }
}

/// Backend used when no classifier command is configured.
///
/// Reports loaded and classifies everything as "no guesses", which flows
/// through the adapter as the could-not-identify outcome instead of a
/// hard failure, so offline mode degrades gracefully.
pub struct UnconfiguredClassifier;

#[async_trait]
impl ClassifierBackend for UnconfiguredClassifier {
    async fn ensure_loaded(&self) -> Result<(), VerdantError> {
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        true
    }

    async fn classify(
        &self,
        _image: &[u8],
        _max_results: usize,
    ) -> Result<Vec<LabelScore>, VerdantError> {
        Ok(Vec::new())
    }
}

fn parse_scores(stdout: &str) -> Vec<LabelScore> {
    stdout
        .lines()
        .filter_map(|line| {
            let (label, confidence) = line.split_once('\t')?;
            let label = label.trim();
            if label.is_empty() {
                return None;
            }
            Some(LabelScore {
                label: label.to_string(),
                confidence: confidence.trim().parse().ok()?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedBackend {
        loaded: bool,
        scores: Vec<LabelScore>,
    }

    #[async_trait]
    impl ClassifierBackend for FixedBackend {
        async fn ensure_loaded(&self) -> Result<(), VerdantError> {
            Ok(())
        }

        fn is_loaded(&self) -> bool {
            self.loaded
        }

        async fn classify(
            &self,
            _image: &[u8],
            max_results: usize,
        ) -> Result<Vec<LabelScore>, VerdantError> {
            let mut scores = self.scores.clone();
            scores.truncate(max_results);
            Ok(scores)
        }
    }

    fn score(label: &str, confidence: f32) -> LabelScore {
        LabelScore {
            label: label.to_string(),
            confidence,
        }
    }

    fn classifier(backend: FixedBackend) -> VisionClassifier {
        VisionClassifier::new(Arc::new(backend), &ProviderConfig::default())
    }

    #[tokio::test]
    async fn test_unloaded_backend_is_model_not_loaded() {
        let classifier = classifier(FixedBackend {
            loaded: false,
            scores: vec![score("rose", 0.9)],
        });
        assert_eq!(
            classifier.classify(&[1, 2, 3]).await.unwrap_err(),
            VerdantError::ModelNotLoaded
        );
    }

    #[tokio::test]
    async fn test_floor_drops_low_confidence_labels() {
        let classifier = classifier(FixedBackend {
            loaded: true,
            scores: vec![score("rose", 0.92), score("flower", 0.60), score("mug", 0.10)],
        });
        let labels = classifier.classify(&[0]).await.unwrap();
        assert_eq!(labels, vec!["rose".to_string(), "flower".to_string()]);
    }

    #[tokio::test]
    async fn test_nothing_above_floor_is_empty_not_error() {
        let classifier = classifier(FixedBackend {
            loaded: true,
            scores: vec![score("blur", 0.05)],
        });
        assert!(classifier.classify(&[0]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_results_are_most_confident_first() {
        let classifier = classifier(FixedBackend {
            loaded: true,
            scores: vec![score("flower", 0.60), score("rose", 0.92)],
        });
        let labels = classifier.classify(&[0]).await.unwrap();
        assert_eq!(labels[0], "rose");
    }

    #[tokio::test]
    async fn test_unconfigured_backend_yields_empty() {
        let classifier = VisionClassifier::new(
            Arc::new(UnconfiguredClassifier),
            &ProviderConfig::default(),
        );
        classifier.ensure_loaded().await.unwrap();
        assert!(classifier.classify(&[0]).await.unwrap().is_empty());
    }

    #[test]
    fn test_parse_scores_skips_malformed_lines() {
        let stdout = "rose\t0.91\nnot a line\nflower\tNaN-ish\n\t0.5\nplant\t0.42\n";
        let scores = parse_scores(stdout);
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0], LabelScore {
            label: "rose".to_string(),
            confidence: 0.91
        });
        assert_eq!(scores[1].label, "plant");
    }
}
