//! Path utilities for CodeMentor data directories.

use std::path::PathBuf;

/// Get the CodeMentor data directory (~/.codementor/).
///
/// Falls back to `./.codementor` when no home directory can be determined.
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".codementor")
}

/// Get the default models directory (~/.codementor/models/).
pub fn models_dir() -> PathBuf {
    data_dir().join("models")
}

/// Get the bin directory (~/.codementor/bin/).
pub fn bin_dir() -> PathBuf {
    data_dir().join("bin")
}

/// Name of the llama-server executable on this platform.
pub fn llama_server_binary_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "llama-server.exe"
    } else {
        "llama-server"
    }
}

/// Get the path to the bundled llama-server binary.
pub fn llama_server_path() -> PathBuf {
    bin_dir().join(llama_server_binary_name())
}

/// Locate a usable llama-server binary.
///
/// The bundled binary in the bin directory wins; otherwise `PATH` is searched.
pub fn find_llama_server() -> Option<PathBuf> {
    let bundled = llama_server_path();
    if bundled.exists() {
        return Some(bundled);
    }
    which::which(llama_server_binary_name()).ok()
}
