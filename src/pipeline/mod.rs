pub mod parse;
pub mod prompts;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::knowledge::PolicyRetriever;
use crate::llm::TextGenerator;
use crate::session::Session;

use parse::{FeedbackIntent, RefinementOutcome};

pub const NO_HISTORY_PLACEHOLDER: &str = "No recent queries available.";

const FOLLOW_UP_SATISFIED: &str =
    "Glad I could help! 😊 Let me know if you have any other questions.";
const FOLLOW_UP_REFINE: &str = "Please provide more details so I can refine my answer. ✏️";
const FOLLOW_UP_NEW_QUESTION: &str = "Sure! What other policy would you like to ask about? 🔄";
const FOLLOW_UP_GENERAL: &str =
    "Thank you for your feedback! Let me know if I can assist you further. 🙌";

/// What one pipeline turn hands back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReply {
    pub response: String,
    pub clarification_needed: bool,
    pub prompt_ticket: bool,
}

impl PipelineReply {
    fn answer(response: String) -> Self {
        Self {
            response,
            clarification_needed: false,
            prompt_ticket: false,
        }
    }

    fn clarification(question: String) -> Self {
        Self {
            response: question,
            clarification_needed: true,
            prompt_ticket: false,
        }
    }

    fn ticket_prompt(response: String) -> Self {
        Self {
            response,
            clarification_needed: false,
            prompt_ticket: true,
        }
    }
}

/// The query-resolution pipeline: refinement (or clarification rewrite) →
/// retrieval → validation → summarization → feedback classification →
/// branch. Stages run strictly in sequence; a clarification question halts
/// the turn before retrieval. No stage is ever retried — generation errors
/// propagate to the request boundary.
pub struct QueryPipeline {
    generator: Arc<dyn TextGenerator>,
    retriever: Arc<dyn PolicyRetriever>,
}

impl QueryPipeline {
    pub fn new(generator: Arc<dyn TextGenerator>, retriever: Arc<dyn PolicyRetriever>) -> Self {
        Self {
            generator,
            retriever,
        }
    }

    /// Run one turn. The caller holds the session lock for the duration,
    /// so a session's turns never interleave.
    pub async fn handle(&self, session: &mut Session, query: &str) -> Result<PipelineReply> {
        session.push_query(query);

        // Refinement: either fold a clarification answer back into the
        // original query, or refine the fresh query against recent history.
        // The pending flag is cleared up front, whatever this turn holds.
        let outcome = match session.take_pending_clarification() {
            Some(original) => {
                info!(original = %original, clarification = query, "Processing clarification answer");
                let rewritten = self
                    .generator
                    .generate(
                        prompts::SUPERVISOR_ROLE,
                        &prompts::rewrite_instruction(&original, query),
                    )
                    .await?;
                RefinementOutcome::parse(&rewritten)
            }
            None => {
                let refined = self
                    .generator
                    .generate(
                        prompts::SUPERVISOR_ROLE,
                        &prompts::refine_instruction(query, &session.recent_queries_joined()),
                    )
                    .await?;
                RefinementOutcome::parse(&refined)
            }
        };

        let refined_query = match outcome {
            RefinementOutcome::Clarification(question) => {
                info!(question = %question, "Clarification needed, halting turn");
                session.set_pending_clarification(query);
                return Ok(PipelineReply::clarification(question));
            }
            RefinementOutcome::Refined(text) => text,
        };
        debug!(refined_query = %refined_query, "Query refined");

        let retrieved = self.retriever.retrieve(&refined_query).await;

        let validated = self
            .generator
            .generate(
                prompts::VALIDATION_ROLE,
                &prompts::validation_instruction(&refined_query, &retrieved),
            )
            .await?;

        let final_response = self
            .generator
            .generate(
                prompts::SUMMARIZATION_ROLE,
                &prompts::summarization_instruction(&validated),
            )
            .await?;
        debug!(len = final_response.len(), "Final response assembled");

        let feedback = self
            .generator
            .generate(
                prompts::FEEDBACK_ROLE,
                &prompts::feedback_instruction(&final_response, &validated),
            )
            .await?;
        let intent = FeedbackIntent::parse(&feedback);
        info!(?intent, "Feedback classified");

        let follow_up = match intent {
            FeedbackIntent::ItIssue => {
                info!("IT issue detected, prompting ticket creation");
                return Ok(PipelineReply::ticket_prompt(final_response));
            }
            FeedbackIntent::Satisfied => FOLLOW_UP_SATISFIED,
            FeedbackIntent::Refine => {
                session.set_pending_refinement(&final_response);
                FOLLOW_UP_REFINE
            }
            FeedbackIntent::NewQuestion => FOLLOW_UP_NEW_QUESTION,
            FeedbackIntent::General => FOLLOW_UP_GENERAL,
        };

        Ok(PipelineReply::answer(format!(
            "{final_response}\n\n🔍 *{follow_up}*"
        )))
    }

    /// Ticket drafting: one generation call, purely a function of inputs.
    pub async fn draft_ticket_summary(
        &self,
        query: &str,
        recent_queries: &[String],
    ) -> Result<String> {
        let history = if recent_queries.is_empty() {
            NO_HISTORY_PLACEHOLDER.to_string()
        } else {
            recent_queries.join("\n")
        };

        info!(query, "Drafting ticket summary");
        self.generator
            .generate(
                prompts::TICKET_ROLE,
                &prompts::ticket_summary_instruction(query, &history),
            )
            .await
    }
}
