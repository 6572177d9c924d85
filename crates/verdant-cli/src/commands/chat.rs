//! `verdant chat` - interactive conversation, optionally grounded in a
//! freshly identified photo.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::Path;

use super::utils::{build_orchestrator, load_config, print_record};
use verdant_core::Transcript;

pub async fn run(image: Option<&Path>, offline: bool, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let orchestrator = build_orchestrator(offline, &config).await?;

    if let Some(image) = image {
        let bytes = std::fs::read(image)
            .with_context(|| format!("failed to read image {}", image.display()))?;
        let mime_type = mime_guess::from_path(image)
            .first_or_octet_stream()
            .to_string();
        match orchestrator.identify(bytes, mime_type).await {
            Ok(record) => {
                print_record(&record);
                println!();
            }
            Err(err) => {
                // Chat still works without a plant context.
                eprintln!("{}", err.user_guidance());
            }
        }
    }

    let plant = orchestrator.active_plant().await;
    let mut transcript = Transcript::with_greeting(plant.as_ref());
    println!("{}", transcript.turns()[0].text);
    println!("(type 'exit' to quit)");

    let stdin = std::io::stdin();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "exit" || message == "quit" {
            break;
        }

        match orchestrator.chat_turn(&mut transcript, message).await {
            Ok(reply) => println!("verdant> {reply}"),
            Err(err) => eprintln!("{}", err.user_guidance()),
        }
    }

    orchestrator.reset().await;
    Ok(())
}
