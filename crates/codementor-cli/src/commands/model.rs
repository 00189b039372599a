//! Model management commands.

use codementor_ai::{AssistantConfig, ModelManager};
use std::path::Path;

fn manager(config: &AssistantConfig) -> ModelManager {
    ModelManager::with_dir(&config.models_dir)
}

/// List installed models.
pub(crate) fn list() -> miette::Result<()> {
    let config = AssistantConfig::from_env();
    let manager = manager(&config);
    let models = manager
        .list_installed()
        .map_err(|e| miette::miette!("Failed to list models: {}", e))?;

    if models.is_empty() {
        println!("No models installed.");
        println!();
        println!("To install the configured model, run:");
        println!("  codementor model pull");
        return Ok(());
    }

    println!("Installed models:");
    for model in models {
        let marker = if model == config.model_filename { " (configured)" } else { "" };
        println!("  - {}{}", model, marker);
    }

    println!();
    println!("Models directory: {}", manager.models_dir().display());

    Ok(())
}

/// Download the configured model, or install one from a local file.
pub(crate) async fn pull(path: Option<&Path>) -> miette::Result<()> {
    let config = AssistantConfig::from_env();
    let manager = manager(&config);

    if let Some(source_path) = path {
        if !source_path.exists() {
            return Err(miette::miette!("File not found: {}", source_path.display()));
        }

        let ext = source_path.extension().and_then(|e| e.to_str());
        if ext != Some("gguf") {
            return Err(miette::miette!(
                "Expected a .gguf file, got: {}",
                source_path.display()
            ));
        }

        println!("Installing model from: {}", source_path.display());
        let dest = manager
            .install_from_path(source_path)
            .map_err(|e| miette::miette!("Failed to install model: {}", e))?;

        println!("Model installed to: {}", dest.display());
        return Ok(());
    }

    let model = config.model_info();
    if manager.is_installed(&model.filename) {
        println!("Model '{}' is already installed.", model.filename);
        return Ok(());
    }

    println!("Downloading model: {}", model.name);
    println!("From: {}", model.url);
    println!("This may take a while depending on your connection...");
    println!();

    let path = manager
        .download(&model)
        .await
        .map_err(|e| miette::miette!("Failed to download model: {}", e))?;

    println!();
    println!("Model downloaded successfully!");
    println!("Location: {}", path.display());

    Ok(())
}

/// Print the path of the model that would be loaded.
pub(crate) fn path() -> miette::Result<()> {
    let config = AssistantConfig::from_env();
    if let Some(path) = &config.model_path {
        println!("{}", path.display());
        return Ok(());
    }

    let manager = manager(&config);
    match manager.get_model_path(&config.model_filename) {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => Err(miette::miette!(
            "Model '{}' is not installed in {}",
            config.model_filename,
            manager.models_dir().display()
        )),
    }
}

/// Remove an installed model file.
pub(crate) fn remove(filename: &str) -> miette::Result<()> {
    let config = AssistantConfig::from_env();
    manager(&config)
        .remove(filename)
        .map_err(|e| miette::miette!("Failed to remove model: {}", e))?;
    println!("Removed {}", filename);
    Ok(())
}
