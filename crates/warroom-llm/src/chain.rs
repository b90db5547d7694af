//! Ordered fallback across alternative model names.
//!
//! Each attempt is independent: quota exhaustion, deprecation, or a transient
//! failure on one model never propagates past the chain — the next entry is
//! tried. Only when every entry has failed does the chain report a distinct
//! exhausted condition, carrying no provider error text, so callers can show
//! a stable message instead of leaking provider internals.

use thiserror::Error;
use tracing::warn;

use crate::client::{GeminiClient, GenerateError, GenerationRequest};

/// Anything that can turn `(model name, request)` into response text.
/// The production backend is [`GeminiClient`]; tests script their own.
pub trait GenerateBackend {
    fn generate(
        &self,
        model: &str,
        req: &GenerationRequest,
    ) -> impl Future<Output = Result<String, GenerateError>> + Send;
}

impl GenerateBackend for GeminiClient {
    fn generate(
        &self,
        model: &str,
        req: &GenerationRequest,
    ) -> impl Future<Output = Result<String, GenerateError>> + Send {
        GeminiClient::generate(self, model, req)
    }
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("no models configured")]
    NoModels,

    /// Every configured model failed. Deliberately free of provider detail.
    #[error("all {attempts} configured models failed")]
    Exhausted { attempts: usize },
}

pub struct ModelChain<B> {
    backend: B,
    models: Vec<String>,
}

impl<B: GenerateBackend> ModelChain<B> {
    pub fn new(backend: B, models: Vec<String>) -> Self {
        Self { backend, models }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Try each model once, in order. The first success wins and its text is
    /// returned verbatim.
    pub async fn generate(&self, req: &GenerationRequest) -> Result<String, ChainError> {
        if self.models.is_empty() {
            return Err(ChainError::NoModels);
        }

        for model in &self.models {
            match self.backend.generate(model, req).await {
                Ok(text) => return Ok(text),
                Err(error) => {
                    warn!(model = %model, %error, "model attempt failed, trying next");
                }
            }
        }

        Err(ChainError::Exhausted {
            attempts: self.models.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted backend: a fixed outcome per model name, recording call order.
    struct Scripted {
        outcomes: HashMap<String, Result<String, u16>>,
        calls: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(outcomes: &[(&str, Result<&str, u16>)]) -> Self {
            Self {
                outcomes: outcomes
                    .iter()
                    .map(|(m, o)| {
                        (m.to_string(), o.map(str::to_string))
                    })
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl GenerateBackend for Scripted {
        async fn generate(&self, model: &str, _req: &GenerationRequest) -> Result<String, GenerateError> {
            self.calls.lock().unwrap().push(model.to_string());
            match self.outcomes.get(model) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(status)) => Err(GenerateError::Api {
                    status: *status,
                    body: "quota exceeded for this model".into(),
                }),
                None => Err(GenerateError::EmptyResponse),
            }
        }
    }

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn first_success_wins_verbatim() {
        let backend = Scripted::new(&[
            ("model-a", Err(429)),
            ("model-b", Err(404)),
            ("model-c", Ok("the third model's exact words")),
        ]);
        let chain = ModelChain::new(backend, models(&["model-a", "model-b", "model-c"]));

        let text = chain.generate(&GenerationRequest::text("hi")).await.unwrap();
        assert_eq!(text, "the third model's exact words");
        assert_eq!(
            *chain.backend.calls.lock().unwrap(),
            vec!["model-a", "model-b", "model-c"]
        );
    }

    #[tokio::test]
    async fn early_success_skips_the_rest() {
        let backend = Scripted::new(&[("model-a", Ok("quick")), ("model-b", Err(500))]);
        let chain = ModelChain::new(backend, models(&["model-a", "model-b"]));

        assert_eq!(chain.generate(&GenerationRequest::text("hi")).await.unwrap(), "quick");
        assert_eq!(*chain.backend.calls.lock().unwrap(), vec!["model-a"]);
    }

    #[tokio::test]
    async fn exhaustion_is_distinct_and_provider_error_free() {
        let backend = Scripted::new(&[("model-a", Err(429)), ("model-b", Err(503))]);
        let chain = ModelChain::new(backend, models(&["model-a", "model-b"]));

        let err = chain.generate(&GenerationRequest::text("hi")).await.unwrap_err();
        match &err {
            ChainError::Exhausted { attempts } => assert_eq!(*attempts, 2),
            other => panic!("expected exhausted, got {:?}", other),
        }
        assert!(!err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn empty_chain_is_rejected() {
        let backend = Scripted::new(&[]);
        let chain = ModelChain::new(backend, vec![]);
        assert!(matches!(
            chain.generate(&GenerationRequest::text("hi")).await,
            Err(ChainError::NoModels)
        ));
    }
}
