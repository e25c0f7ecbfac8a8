//! Completion-service construction from environment configuration

use super::{CompletionService, LoggingService, OpenAIModel, OpenAIService};
use std::sync::Arc;

/// Configuration for the completion provider
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub openai_api_key: Option<String>,
    /// Optional gateway URL routed in front of the provider API.
    pub gateway: Option<String>,
    /// Chat model name, defaults to `gpt-4o-mini`.
    pub model: Option<String>,
    /// Sampling temperature applied to every request.
    pub temperature: Option<f32>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            gateway: std::env::var("LLM_GATEWAY").ok(),
            model: std::env::var("CHAT_MODEL").ok(),
            temperature: std::env::var("CHAT_TEMPERATURE")
                .ok()
                .and_then(|t| t.parse().ok()),
        }
    }
}

/// Build the completion service, wrapped with logging.
///
/// Returns `None` when neither an API key nor a gateway is configured;
/// the server still runs, chat endpoints answer 503 until configured.
pub fn create_service(config: &LlmConfig) -> Option<Arc<dyn CompletionService>> {
    // Behind a gateway the key is implicit; direct mode requires one.
    let api_key = match (&config.openai_api_key, &config.gateway) {
        (Some(key), _) if !key.is_empty() => key.clone(),
        (_, Some(_)) => "implicit".to_string(),
        _ => return None,
    };

    let model = OpenAIModel::from_config(config.model.as_deref().unwrap_or("gpt-4o-mini"));
    let service = OpenAIService::new(api_key, model, config.gateway.as_deref());
    Some(Arc::new(LoggingService::new(Arc::new(service))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_key_no_service() {
        assert!(create_service(&LlmConfig::default()).is_none());
    }

    #[test]
    fn key_builds_default_model() {
        let config = LlmConfig {
            openai_api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        let service = create_service(&config).unwrap();
        assert_eq!(service.model_id(), "gpt-4o-mini");
    }

    #[test]
    fn gateway_alone_is_enough() {
        let config = LlmConfig {
            gateway: Some("http://gw".to_string()),
            model: Some("gpt-4o".to_string()),
            ..Default::default()
        };
        let service = create_service(&config).unwrap();
        assert_eq!(service.model_id(), "gpt-4o");
    }
}
