//! Info and health commands.

use codementor_ai::{local_ai_paths, AssistantConfig, Health, Mode, ModelManager};

use super::assistant;

pub(crate) fn run() -> miette::Result<()> {
    let config = AssistantConfig::from_env();
    let manager = ModelManager::with_dir(&config.models_dir);

    println!("CodeMentor");
    println!("==========");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("Modes:");
    for mode in Mode::ALL {
        let params = mode.parameters();
        let temperature = params
            .temperature
            .map(|t| t.to_string())
            .unwrap_or_else(|| "default".to_string());
        println!(
            "  {:<16} max_tokens={:<4} temperature={}",
            mode.as_str(),
            params.max_tokens,
            temperature
        );
    }
    println!();

    println!("Model:");
    println!("  Repository:  {}", config.repo_id);
    println!("  File:        {}", config.model_filename);
    match &config.model_path {
        Some(path) => println!("  Path:        {} (MODEL_PATH)", path.display()),
        None => println!(
            "  Installed:   {}",
            manager.is_installed(&config.model_filename)
        ),
    }
    println!("  Directory:   {}", manager.models_dir().display());
    println!();

    println!("Server:");
    match &config.server_url {
        Some(url) => println!("  External:    {}", url),
        None => {
            let binary = local_ai_paths::find_llama_server();
            println!(
                "  Binary:      {}",
                binary
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "not found".to_string())
            );
            println!("  Port:        {}", config.port);
            println!(
                "  Threads:     {}  ctx: {}  batch: {}",
                config.threads, config.ctx_size, config.batch_size
            );
        }
    }
    if let Some(rules) = &config.leakage_rules {
        println!();
        println!("Leakage rules: {}", rules.display());
    }

    Ok(())
}

/// Load the model and report whether it is usable.
pub(crate) async fn health(json: bool) -> miette::Result<()> {
    let health = assistant()?.health().await;

    if json {
        let out = serde_json::to_string(&health)
            .map_err(|e| miette::miette!("Failed to serialize result: {}", e))?;
        println!("{}", out);
    }

    match health {
        Health::Ok => {
            if !json {
                println!("ok");
            }
            Ok(())
        }
        Health::Error { detail } => Err(miette::miette!("Model not ready: {}", detail)),
    }
}
