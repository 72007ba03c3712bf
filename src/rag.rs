//! Question answering: retrieve, render the prompt, generate.
//!
//! [`RagPipeline::answer`] holds no state across calls. Each call retrieves a
//! fresh context bundle, renders [`PROMPT_TEMPLATE`] with it, and returns the
//! generator's text unmodified. An empty bundle is not an error; the prompt
//! still goes out and the model is expected to refuse.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::generation::GeneratorSource;
use crate::search::Retriever;
use crate::store::VectorIndex;

/// Answer phrase the model is told to use when the context is insufficient.
pub const REFUSAL: &str = "I don't know based on the data";

/// Chat-format prompt with `{context}` and `{question}` slots.
pub const PROMPT_TEMPLATE: &str = "<|system|>
You are a helpful car assistant. Use the provided context to answer the user's question about cars.
If the answer is not in the context, say \"I don't know based on the data\".
Context:
{context}
</s>
<|user|>
{question}
</s>
<|assistant|>";

/// Fill both slots of [`PROMPT_TEMPLATE`]. The question is inserted
/// verbatim, after the context, so braces in retrieved text are never
/// reinterpreted as slots.
pub fn render_prompt(context: &str, question: &str) -> String {
    match PROMPT_TEMPLATE.split_once("{question}") {
        Some((head, tail)) => {
            let mut prompt = head.replace("{context}", context);
            prompt.push_str(question);
            prompt.push_str(tail);
            prompt
        }
        None => PROMPT_TEMPLATE.replace("{context}", context),
    }
}

pub struct RagPipeline {
    retriever: Retriever,
    generators: GeneratorSource,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(retriever: Retriever, generators: GeneratorSource, top_k: usize) -> Self {
        Self {
            retriever,
            generators,
            top_k,
        }
    }

    /// Pipeline over `index` whose generator follows the environment
    /// credentials, re-read on every answer.
    pub fn from_config(
        config: &Config,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self::new(
            Retriever::new(index, embedder, config.index.collection.clone()),
            GeneratorSource::from_env(config.generation.clone()),
            config.retrieval.top_k,
        )
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn answer(&self, query: &str) -> Result<String> {
        let generator = self.generators.generator()?;
        let context = self.retriever.retrieve(query, self.top_k).await?;
        debug!(passages = context.len(), "context assembled");

        let prompt = render_prompt(&context.text(), query);
        let answer = generator.generate(&prompt).await?;
        info!(backend = generator.backend_name(), passages = context.len(), "answered");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fills_both_slots() {
        let prompt = render_prompt("The 2017 Toyota 86 ...", "How much power?");
        assert!(prompt.starts_with("<|system|>\n"));
        assert!(prompt.contains("Context:\nThe 2017 Toyota 86 ...\n</s>"));
        assert!(prompt.contains("<|user|>\nHow much power?\n</s>"));
        assert!(prompt.ends_with("<|assistant|>"));
        assert!(prompt.contains(REFUSAL));
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("{question}"));
    }

    #[test]
    fn test_render_empty_context() {
        let prompt = render_prompt("", "q");
        assert!(prompt.contains("Context:\n\n</s>"));
    }

    #[test]
    fn test_slot_text_is_not_reinterpreted() {
        let prompt = render_prompt("literal {question}", "what about {context}?");
        assert!(prompt.contains("Context:\nliteral {question}\n</s>"));
        assert!(prompt.contains("<|user|>\nwhat about {context}?\n</s>"));
    }
}
