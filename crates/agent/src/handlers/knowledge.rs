use std::sync::Arc;

use async_trait::async_trait;
use tera::Context;
use tracing::debug;

use teleassist_core::errors::HandlerError;
use teleassist_core::ports::{Handler, HandlerRequest};

use super::{llm_failure, HandlerContext};
use crate::llm::LlmRequest;
use crate::prompts::{KNOWLEDGE_ANSWER, SYSTEM_KNOWLEDGE};
use crate::retrieval::{KnowledgeRetriever, Passage};

pub const NO_DOCUMENTATION: &str = "I couldn't find any documentation that covers that question. \
    Try rephrasing it, or ask about your bill, network problems or service plans.";

pub struct KnowledgeHandler {
    context: HandlerContext,
    retriever: Arc<dyn KnowledgeRetriever>,
    top_k: usize,
}

impl KnowledgeHandler {
    pub fn new(context: HandlerContext, retriever: Arc<dyn KnowledgeRetriever>, top_k: usize) -> Self {
        Self { context, retriever, top_k: top_k.max(1) }
    }
}

#[async_trait]
impl Handler for KnowledgeHandler {
    fn name(&self) -> &'static str {
        "knowledge"
    }

    fn requires_identity(&self) -> bool {
        false
    }

    async fn handle(&self, request: &HandlerRequest) -> Result<String, HandlerError> {
        let hits = self.retriever.retrieve(&request.query, self.top_k).await?;
        debug!(
            event_name = "knowledge.retrieved",
            correlation_id = %request.correlation_id,
            passages = hits.len(),
            "knowledge passages retrieved"
        );
        if hits.is_empty() {
            return Ok(NO_DOCUMENTATION.to_string());
        }

        let passages = hits.into_iter().map(|hit| hit.passage).collect::<Vec<Passage>>();
        let facts = passages
            .iter()
            .map(|passage| format!("[{}]\n{}", passage.source, passage.text))
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut prompt_context = Context::new();
        prompt_context.insert("query", &request.query);
        prompt_context.insert("passages", &passages);
        let prompt = self.context.prompts.render(KNOWLEDGE_ANSWER, &prompt_context)?;

        let reply = self
            .context
            .llm
            .complete(&LlmRequest::new(SYSTEM_KNOWLEDGE, prompt, facts.clone()))
            .await
            .map_err(llm_failure)?;
        Ok(self.context.grounding.apply(reply, &[], &facts))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use teleassist_core::ports::{Handler, HandlerRequest};
    use teleassist_core::Role;

    use super::{KnowledgeHandler, NO_DOCUMENTATION};
    use crate::handlers::testing::{context, store};
    use crate::llm::{OfflineLlmClient, StaticLlmClient};
    use crate::retrieval::{DocumentIndex, Passage};

    fn anonymous(query: &str) -> HandlerRequest {
        HandlerRequest {
            correlation_id: "k".into(),
            query: query.into(),
            role: Role::Unknown,
            subject_id: None,
        }
    }

    fn index() -> Arc<DocumentIndex> {
        Arc::new(DocumentIndex::from_passages(vec![
            Passage {
                source: "roaming.md".into(),
                text: "Enable international roaming in the account settings before you travel.".into(),
            },
            Passage { source: "voicemail.md".into(), text: "Dial 121 to reach voicemail.".into() },
        ]))
    }

    #[tokio::test]
    async fn answers_anonymous_callers_from_documents() {
        let handler = KnowledgeHandler::new(context(store().await, Arc::new(OfflineLlmClient)), index(), 3);
        assert!(!handler.requires_identity());

        let answer = handler.handle(&anonymous("How do I enable roaming?")).await.expect("answer");
        assert!(answer.contains("[roaming.md]"), "{answer}");
        assert!(!answer.contains("voicemail"));
    }

    #[tokio::test]
    async fn no_matching_passage_says_so_without_calling_the_model() {
        let llm = Arc::new(StaticLlmClient::new("unused"));
        let handler = KnowledgeHandler::new(context(store().await, llm.clone()), index(), 3);
        let answer = handler.handle(&anonymous("quantum entanglement")).await.expect("answer");
        assert_eq!(answer, NO_DOCUMENTATION);
        assert!(llm.requests().is_empty());
    }

    #[tokio::test]
    async fn model_prompt_carries_retrieved_passages() {
        let llm = Arc::new(StaticLlmClient::new("Dial 121."));
        let handler = KnowledgeHandler::new(context(store().await, llm.clone()), index(), 1);
        let answer = handler.handle(&anonymous("voicemail number")).await.expect("answer");
        assert_eq!(answer, "Dial 121.");
        assert!(llm.requests()[0].prompt.contains("[voicemail.md]"));
    }
}
