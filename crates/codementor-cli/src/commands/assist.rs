//! Generate, autocomplete, explain and regenerate commands.

use codementor_ai::{Artifact, AssistantError, UserLevel};
use std::path::Path;

use super::{assistant, read_code};

pub(crate) async fn generate(task: &str, language: &str, json: bool) -> miette::Result<()> {
    let artifact = assistant()?
        .generate(task, language)
        .await
        .map_err(unavailable)?;
    print_artifact(&artifact, json)
}

pub(crate) async fn autocomplete(
    file: Option<&Path>,
    language: &str,
    json: bool,
) -> miette::Result<()> {
    let code = read_code(file)?;
    let artifact = assistant()?
        .autocomplete(&code, language)
        .await
        .map_err(unavailable)?;
    print_artifact(&artifact, json)
}

pub(crate) async fn explain(
    task: &str,
    file: Option<&Path>,
    language: &str,
    level: &str,
    user: &str,
    json: bool,
) -> miette::Result<()> {
    let level: UserLevel = level.parse().map_err(|e| miette::miette!("{}", e))?;
    let code = read_code(file)?;
    let artifact = assistant()?
        .explain(task, language, &code, user, level)
        .await
        .map_err(unavailable)?;
    print_artifact(&artifact, json)
}

pub(crate) async fn regenerate(
    task: &str,
    file: Option<&Path>,
    language: &str,
    user: &str,
    json: bool,
) -> miette::Result<()> {
    // Regeneration works from the task alone unless a file is given.
    let code = match file {
        Some(path) => read_code(Some(path))?,
        None => String::new(),
    };
    let artifact = assistant()?
        .regenerate_code(task, language, &code, user)
        .await
        .map_err(unavailable)?;
    print_artifact(&artifact, json)
}

pub(crate) fn unavailable(e: AssistantError) -> miette::Report {
    miette::miette!(
        "{}\n\n\
         Make sure a model is available:\n\
           1. Download it: codementor model pull\n\
           2. Or point MODEL_PATH at a .gguf file\n\
           3. Or set LLAMA_SERVER_URL to a running llama-server",
        e
    )
}

pub(crate) fn print_artifact(artifact: &Artifact, json: bool) -> miette::Result<()> {
    if json {
        let out = serde_json::to_string_pretty(artifact)
            .map_err(|e| miette::miette!("Failed to serialize result: {}", e))?;
        println!("{}", out);
    } else {
        println!("{}", artifact.text);
        if !artifact.is_generated() {
            tracing::debug!("{} returned {:?} text", artifact.mode, artifact.status);
        }
    }
    Ok(())
}
