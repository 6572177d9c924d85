//! `verdant identify` - one-shot identification of an image file.

use anyhow::{Context, Result};
use std::path::Path;

use super::utils::{build_orchestrator, load_config, print_record};

pub async fn run(image: &Path, offline: bool, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let orchestrator = build_orchestrator(offline, &config).await?;

    let bytes = std::fs::read(image)
        .with_context(|| format!("failed to read image {}", image.display()))?;
    let mime_type = mime_guess::from_path(image)
        .first_or_octet_stream()
        .to_string();

    match orchestrator.identify(bytes, mime_type).await {
        Ok(record) => {
            print_record(&record);
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", err.user_guidance());
            Err(err.into())
        }
    }
}
