//! Process manager for llama-server.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::client::LlamaCppClient;
use crate::error::LocalAIError;
use crate::paths;
use crate::DEFAULT_PORT;

/// Runtime settings passed to llama-server on start.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub port: u16,
    pub ctx_size: u32,
    pub threads: u32,
    pub batch_size: u32,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            ctx_size: 512,
            threads: 4,
            batch_size: 128,
        }
    }
}

/// Manager for the llama-server process.
pub struct LlamaCppServer {
    model_path: PathBuf,
    settings: ServerSettings,
    process: Option<Child>,
}

impl LlamaCppServer {
    /// Create a new server manager with default settings.
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            settings: ServerSettings::default(),
            process: None,
        }
    }

    /// Replace the runtime settings.
    pub fn with_settings(mut self, settings: ServerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set a custom port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.settings.port = port;
        self
    }

    /// Get the port this server is configured to use.
    pub fn port(&self) -> u16 {
        self.settings.port
    }

    /// Check if the model file exists.
    pub fn model_exists(&self) -> bool {
        self.model_path.exists()
    }

    /// Command-line arguments llama-server is launched with.
    pub fn args(&self) -> Vec<String> {
        vec![
            "--model".to_string(),
            self.model_path.display().to_string(),
            "--host".to_string(),
            "127.0.0.1".to_string(),
            "--port".to_string(),
            self.settings.port.to_string(),
            "--ctx-size".to_string(),
            self.settings.ctx_size.to_string(),
            "--threads".to_string(),
            self.settings.threads.to_string(),
            "--batch-size".to_string(),
            self.settings.batch_size.to_string(),
        ]
    }

    /// Start the llama-server process.
    pub fn start(&mut self) -> Result<(), LocalAIError> {
        let server_path = paths::find_llama_server().ok_or_else(|| {
            LocalAIError::ServerBinaryNotFound(paths::bin_dir().display().to_string())
        })?;

        if !self.model_exists() {
            return Err(LocalAIError::ModelNotFound(
                self.model_path.display().to_string(),
            ));
        }

        info!(
            "Starting llama-server on port {} with model {:?}",
            self.settings.port, self.model_path
        );

        let child = Command::new(&server_path)
            .args(self.args())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| LocalAIError::ServerStartFailed(e.to_string()))?;

        debug!("llama-server process started with PID: {}", child.id());
        self.process = Some(child);

        Ok(())
    }

    /// Wait for the server to become ready.
    pub async fn wait_ready(&mut self, timeout: Duration) -> Result<(), LocalAIError> {
        let client = self.client();
        let start = std::time::Instant::now();
        let check_interval = Duration::from_millis(500);

        info!("Waiting for llama-server to become ready...");

        while start.elapsed() < timeout {
            match client.check_health().await {
                Ok(()) => {
                    info!("llama-server is ready");
                    return Ok(());
                }
                Err(_) => {
                    if !self.is_running() {
                        return Err(LocalAIError::ServerStartFailed(
                            "process exited before becoming ready".to_string(),
                        ));
                    }
                    debug!("Server not ready yet");
                    sleep(check_interval).await;
                }
            }
        }

        Err(LocalAIError::ServerStartTimeout)
    }

    /// Stop the server process.
    pub fn stop(&mut self) -> Result<(), LocalAIError> {
        if let Some(mut child) = self.process.take() {
            info!("Stopping llama-server (PID: {})", child.id());

            #[cfg(unix)]
            {
                // SAFETY: sending a signal to a child PID we spawned and still own.
                unsafe {
                    libc::kill(child.id() as i32, libc::SIGTERM);
                }
                std::thread::sleep(Duration::from_millis(500));
            }

            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!("Server exited with status: {:?}", status);
                }
                Ok(None) => {
                    warn!("Server didn't exit gracefully, killing...");
                    let _ = child.kill();
                    let _ = child.wait();
                }
                Err(e) => {
                    warn!("Error checking server status: {}", e);
                    let _ = child.kill();
                }
            }
        }
        Ok(())
    }

    /// Check if the server process is running.
    pub fn is_running(&mut self) -> bool {
        if let Some(ref mut child) = self.process {
            match child.try_wait() {
                Ok(Some(_)) => {
                    self.process = None;
                    false
                }
                Ok(None) => true,
                Err(_) => false,
            }
        } else {
            false
        }
    }

    /// Get a client connected to this server.
    pub fn client(&self) -> LlamaCppClient {
        LlamaCppClient::with_port(self.settings.port)
    }
}

impl Drop for LlamaCppServer {
    fn drop(&mut self) {
        if self.process.is_some() {
            let _ = self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config() {
        let server = LlamaCppServer::new("test-model.gguf").with_port(9999);
        assert_eq!(server.port(), 9999);
        assert_eq!(server.client().base_url(), "http://127.0.0.1:9999");
    }

    #[test]
    fn test_args_carry_settings() {
        let server = LlamaCppServer::new("/models/m.gguf").with_settings(ServerSettings {
            port: 8088,
            ctx_size: 1024,
            threads: 8,
            batch_size: 256,
        });
        let args = server.args();
        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("--model") + 1], "/models/m.gguf");
        assert_eq!(args[pos("--port") + 1], "8088");
        assert_eq!(args[pos("--ctx-size") + 1], "1024");
        assert_eq!(args[pos("--threads") + 1], "8");
        assert_eq!(args[pos("--batch-size") + 1], "256");
    }

    #[test]
    fn test_start_without_model_fails() {
        let mut server = LlamaCppServer::new("/definitely/not/here.gguf");
        assert!(server.start().is_err());
        assert!(!server.is_running());
    }
}
