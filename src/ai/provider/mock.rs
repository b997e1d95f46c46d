//! Scripted provider for unit tests

use std::sync::Mutex;

use async_trait::async_trait;

use super::{CompletionRequest, LlmProvider, LlmResponse};
use crate::types::Result;

type Responder = dyn Fn(usize, &CompletionRequest) -> Result<String> + Send + Sync;

/// Answers each call with a closure of `(call_index, request)` and keeps
/// every prompt it was sent.
pub(crate) struct ScriptedProvider {
    responder: Box<Responder>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub(crate) fn new(
        responder: impl Fn(usize, &CompletionRequest) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with the same text
    pub(crate) fn constant(text: &'static str) -> Self {
        Self::new(move |_, _| Ok(text.to_string()))
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse> {
        let index = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(request.prompt.clone());
            prompts.len() - 1
        };
        (self.responder)(index, request).map(LlmResponse::content_only)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
