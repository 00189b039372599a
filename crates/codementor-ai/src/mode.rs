//! Operation modes, their fixed sampling parameters, and request data.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default stop sequences: end-of-sequence and section break.
pub const DEFAULT_STOP: [&str; 2] = ["</s>", "###"];

/// Language used when a request does not name one.
pub const DEFAULT_LANGUAGE: &str = "python";

/// The four operations the assistant performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Short code snippet from a task description.
    Generate,
    /// Continuation of existing code.
    Autocomplete,
    /// Mentor-style explanation of existing code.
    Explain,
    /// Code-only answer that ends with an end marker.
    RegenerateCode,
}

impl Mode {
    pub const ALL: [Mode; 4] = [
        Mode::Generate,
        Mode::Autocomplete,
        Mode::Explain,
        Mode::RegenerateCode,
    ];

    /// Fixed generation parameters for this mode.
    pub fn parameters(self) -> GenerationParameters {
        match self {
            Mode::Generate => GenerationParameters::new(100, None),
            Mode::Autocomplete => GenerationParameters::new(40, None),
            Mode::Explain => GenerationParameters::new(400, Some(0.3)),
            Mode::RegenerateCode => GenerationParameters::new(400, Some(0.2)),
        }
    }

    /// Text returned when the pipeline produced nothing usable.
    pub fn fallback_text(self) -> &'static str {
        match self {
            Mode::Generate => "⚠️ Unable to generate code, please try again.",
            Mode::Autocomplete => "⚠️ Unable to generate a suggestion.",
            Mode::Explain => "⚠️ Unable to generate explanation, please try again.",
            Mode::RegenerateCode => "⚠️ Unable to generate valid code.",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Generate => "generate",
            Mode::Autocomplete => "autocomplete",
            Mode::Explain => "explain",
            Mode::RegenerateCode => "regenerate_code",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampling parameters for one completion call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationParameters {
    /// Token budget.
    pub max_tokens: u32,
    /// `None` leaves the engine default in place.
    pub temperature: Option<f32>,
    pub stop: Vec<String>,
}

impl GenerationParameters {
    fn new(max_tokens: u32, temperature: Option<f32>) -> Self {
        Self {
            max_tokens,
            temperature,
            stop: DEFAULT_STOP.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Expertise level of the person asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl UserLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            UserLevel::Beginner => "beginner",
            UserLevel::Intermediate => "intermediate",
            UserLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for UserLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an expertise level outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown user level '{0}' (expected beginner, intermediate or advanced)")]
pub struct UnknownUserLevel(pub String);

impl FromStr for UserLevel {
    type Err = UnknownUserLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(UserLevel::Beginner),
            "intermediate" => Ok(UserLevel::Intermediate),
            "advanced" => Ok(UserLevel::Advanced),
            _ => Err(UnknownUserLevel(s.to_string())),
        }
    }
}

/// A single assistant request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub mode: Mode,
    /// Task text; empty for autocomplete.
    #[serde(default)]
    pub task: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub user_level: Option<UserLevel>,
    /// Opaque caller identity, used for log context only.
    #[serde(default)]
    pub user_id: Option<String>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl GenerationRequest {
    pub fn new(mode: Mode, task: impl Into<String>) -> Self {
        Self {
            mode,
            task: task.into(),
            language: default_language(),
            code: None,
            user_level: None,
            user_id: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_user_level(mut self, level: UserLevel) -> Self {
        self.user_level = Some(level);
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Existing code, or the empty string.
    pub fn code(&self) -> &str {
        self.code.as_deref().unwrap_or("")
    }

    /// Expertise level, defaulting to intermediate.
    pub fn level(&self) -> UserLevel {
        self.user_level.unwrap_or_default()
    }
}
