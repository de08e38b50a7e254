pub mod settings;

pub use settings::{
    ClassifierConfig, HealthConfig, LoggingConfig, OllamaConfig, ServerConfig, Settings,
};
