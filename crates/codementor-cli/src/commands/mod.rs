//! CLI commands.

pub mod assist;
pub mod info;
pub mod interactive;
pub mod model;
pub mod tools;

use codementor_ai::{Assistant, AssistantConfig};
use std::io::Read;
use std::path::Path;

/// Build an assistant from environment configuration.
pub(crate) fn assistant() -> miette::Result<Assistant> {
    Assistant::from_config(AssistantConfig::from_env())
        .map_err(|e| miette::miette!("Invalid configuration: {}", e))
}

/// Read code from a file, or from stdin when no file is given.
pub(crate) fn read_code(file: Option<&Path>) -> miette::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| miette::miette!("Failed to read {}: {}", path.display(), e)),
        None => {
            let mut code = String::new();
            std::io::stdin()
                .read_to_string(&mut code)
                .map_err(|e| miette::miette!("Failed to read stdin: {}", e))?;
            Ok(code)
        }
    }
}
