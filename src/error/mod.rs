use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};


/// The unified error type for augmentflow
#[derive(Error, Debug)]
pub enum AugmentError {
    #[error("[E{code:04}] Parse error: {message}")]
    Parse {
        code: u16,
        message: String,
        suggestions: Vec<String>,
    },

    #[error("[E{code:04}] Validation error: {message}")]
    Validation {
        code: u16,
        message: String,
        field: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Transform execution failed: {message}")]
    TransformExecution {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Optional stage error: {message}")]
    OptionalStage {
        code: u16,
        message: String,
        stage: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Pipeline timeout: {message}")]
    PipelineTimeout {
        code: u16,
        message: String,
        elapsed: Option<Duration>,
    },

    #[error("[E{code:04}] Configuration error: {message}")]
    Configuration {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Stage error: {message}")]
    Stage {
        code: u16,
        message: String,
        stage: Option<String>,
        hook: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] {message}")]
    Other {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl AugmentError {
    /// Create a parse error with default code
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            code: ErrorCode::PARSE_GENERIC,
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    /// Create a parse error with specific code and suggestions
    pub fn parse_with_code(code: u16, message: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self::Parse {
            code,
            message: message.into(),
            suggestions,
        }
    }

    /// Create a validation error with default code
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::VALIDATION_GENERIC,
            message: message.into(),
            field: None,
            source: None,
        }
    }

    /// Create a validation error with specific code and field
    pub fn validation_with_code(
        code: u16,
        message: impl Into<String>,
        field: Option<String>,
    ) -> Self {
        Self::Validation {
            code,
            message: message.into(),
            field,
            source: None,
        }
    }

    /// Create a transform execution error with default code
    pub fn transform_execution(message: impl Into<String>) -> Self {
        Self::TransformExecution {
            code: ErrorCode::TRANSFORM_ENGINE_FAILED,
            message: message.into(),
            source: None,
        }
    }

    /// Create a transform execution error with specific code
    pub fn transform_execution_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::TransformExecution {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create an optional stage error
    pub fn optional_stage(code: u16, message: impl Into<String>, stage: Option<String>) -> Self {
        Self::OptionalStage {
            code,
            message: message.into(),
            stage,
            source: None,
        }
    }

    /// Create a pipeline timeout error
    pub fn pipeline_timeout(message: impl Into<String>, elapsed: Option<Duration>) -> Self {
        Self::PipelineTimeout {
            code: ErrorCode::TIMEOUT_RUN_DEADLINE,
            message: message.into(),
            elapsed,
        }
    }

    /// Create a cancellation error (reported through the timeout family)
    pub fn cancelled(message: impl Into<String>, elapsed: Option<Duration>) -> Self {
        Self::PipelineTimeout {
            code: ErrorCode::RUN_CANCELLED,
            message: message.into(),
            elapsed,
        }
    }

    /// Create a configuration error with default code
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            code: ErrorCode::CONFIG_GENERIC,
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with specific code
    pub fn configuration_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Configuration {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a mandatory stage error
    pub fn stage(
        code: u16,
        message: impl Into<String>,
        stage: Option<String>,
        hook: Option<String>,
    ) -> Self {
        Self::Stage {
            code,
            message: message.into(),
            stage,
            hook,
            source: None,
        }
    }

    /// Create a generic other error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            code: ErrorCode::OTHER_GENERIC,
            message: message.into(),
            source: None,
        }
    }

    /// Create an other error with specific code
    pub fn other_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Other {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error to this error
    ///
    /// Parse and timeout errors carry no source; the call is a no-op for them.
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match &mut self {
            Self::Validation { source: src, .. }
            | Self::TransformExecution { source: src, .. }
            | Self::OptionalStage { source: src, .. }
            | Self::Configuration { source: src, .. }
            | Self::Stage { source: src, .. }
            | Self::Other { source: src, .. } => {
                *src = Some(source.into());
            }
            Self::Parse { .. } | Self::PipelineTimeout { .. } => {}
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Parse { message, .. }
            | Self::Validation { message, .. }
            | Self::TransformExecution { message, .. }
            | Self::OptionalStage { message, .. }
            | Self::PipelineTimeout { message, .. }
            | Self::Configuration { message, .. }
            | Self::Stage { message, .. }
            | Self::Other { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
        }
        self
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Parse { .. } => 2,
            Self::Validation { .. } => 3,
            Self::TransformExecution { .. } => 4,
            Self::OptionalStage { .. } => 5,
            Self::PipelineTimeout { .. } => 6,
            Self::Configuration { .. } => 7,
            Self::Stage { .. } => 8,
            Self::Other { .. } => 1,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Parse { code, .. }
            | Self::Validation { code, .. }
            | Self::TransformExecution { code, .. }
            | Self::OptionalStage { code, .. }
            | Self::PipelineTimeout { code, .. }
            | Self::Configuration { code, .. }
            | Self::Stage { code, .. }
            | Self::Other { code, .. } => *code,
        }
    }

    /// Short machine-readable kind name
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "parse",
            Self::Validation { .. } => "validation",
            Self::TransformExecution { .. } => "transform_execution",
            Self::OptionalStage { .. } => "optional_stage",
            Self::PipelineTimeout { .. } => "pipeline_timeout",
            Self::Configuration { .. } => "configuration",
            Self::Stage { .. } => "stage",
            Self::Other { .. } => "other",
        }
    }

    /// Suggestions attached to a parse error
    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::Parse { suggestions, .. } => suggestions,
            _ => &[],
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Parse {
                message,
                suggestions,
                ..
            } => {
                if suggestions.is_empty() {
                    format!("Could not understand the prompt: {}", message)
                } else {
                    format!(
                        "Could not understand the prompt: {} (try: {})",
                        message,
                        suggestions.join(", ")
                    )
                }
            }
            Self::Validation { message, field, .. } => {
                if let Some(f) = field {
                    format!("Invalid value for '{}': {}", f, message)
                } else {
                    format!("Validation error: {}", message)
                }
            }
            Self::TransformExecution { message, .. } => {
                format!("Transform engine failed: {}", message)
            }
            Self::OptionalStage { message, stage, .. } => match stage {
                Some(s) => format!("Optional stage '{}' failed: {}", s, message),
                None => format!("Optional stage failed: {}", message),
            },
            Self::PipelineTimeout { message, .. } => format!("Pipeline stopped: {}", message),
            Self::Configuration { message, .. } => format!("Configuration problem: {}", message),
            Self::Stage {
                message,
                stage,
                hook,
                ..
            } => {
                let mut msg = String::from("Pipeline failed");
                if let Some(s) = stage {
                    msg.push_str(&format!(" at stage '{}'", s));
                }
                if let Some(h) = hook {
                    msg.push_str(&format!(" in hook '{}'", h));
                }
                format!("{}: {}", msg, message)
            }
            Self::Other { message, .. } => message.clone(),
        }
    }

    /// Whether the error aborts a pipeline run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::OptionalStage { .. })
    }
}

/// Type alias for Results using AugmentError
pub type Result<T> = std::result::Result<T, AugmentError>;

impl From<std::io::Error> for AugmentError {
    fn from(err: std::io::Error) -> Self {
        AugmentError::other_with_code(ErrorCode::OTHER_IO, "I/O operation failed").with_source(err)
    }
}

impl From<serde_json::Error> for AugmentError {
    fn from(err: serde_json::Error) -> Self {
        AugmentError::other_with_code(ErrorCode::OTHER_SERIALIZATION, "JSON serialization failed")
            .with_source(err)
    }
}

impl From<toml::de::Error> for AugmentError {
    fn from(err: toml::de::Error) -> Self {
        AugmentError::configuration_with_code(ErrorCode::CONFIG_INVALID_TOML, "Invalid TOML syntax")
            .with_source(err)
    }
}
