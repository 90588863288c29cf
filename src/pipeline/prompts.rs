//! Per-stage prompt builders. Each stage gets a role (system prompt) and an
//! instruction rendered from typed inputs, so correctness never depends on
//! placeholder-key strings lining up.

pub const SUPERVISOR_ROLE: &str = "You are a supervisor for a company policy assistant. \
    Your goal is to ensure the user's query is specific and well-defined. \
    You help refine vague queries to ensure the best possible response.";

pub const VALIDATION_ROLE: &str = "You are a validation reviewer for a company policy assistant. \
    Your goal is to ensure retrieved policies are accurate and clear. \
    You verify if the retrieved policies fully answer the query.";

pub const SUMMARIZATION_ROLE: &str = "You are an editor for a company policy assistant. \
    Your goal is to ensure the final response is concise and structured. \
    You refine validated responses into clear, well-structured answers.";

pub const FEEDBACK_ROLE: &str = "You analyze user responses for a company policy assistant and \
    classify their intent (satisfied, refinement needed, new query, IT issue, or general \
    feedback). If an IT issue is detected, confirm with the user if they want to create a \
    support ticket.";

pub const TICKET_ROLE: &str = "You are an IT support intake assistant. \
    You generate a structured ticket summary when users require further IT assistance.";

/// Stage 2 (no pending clarification): refine the query or ask ONE question.
pub fn refine_instruction(query: &str, recent_queries: &str) -> String {
    format!(
        "You refine vague queries before retrieval. \
        Rephrase the query into a more specific form or ask ONE targeted clarifying question. \
        Return either:\n\
        - A refined query\n\
        - A single clarification question (if needed)\n\
        - The same query (if already clear)\n\n\
        User query: {query}\n\n\
        Recent queries for context:\n{recent_queries}"
    )
}

/// Stage 2 (pending clarification): fold the user's answer back into the
/// original query.
pub fn rewrite_instruction(original_query: &str, clarification: &str) -> String {
    format!(
        "Rephrase the following query into a structured, self-contained search query. \
        Ensure it is meaningful and provides complete context.\n\n\
        Original Query: {original_query}\n\
        User Clarification: {clarification}"
    )
}

/// Stage 5: confirm relevance, summarize partial matches, or flag a mismatch.
pub fn validation_instruction(query: &str, retrieved_policies: &str) -> String {
    format!(
        "Check if the retrieved policies are relevant to the user's query.\n\
        - If they fully answer the question, return them as-is.\n\
        - If they are partially relevant, summarize the key points.\n\
        - If they do not match, suggest refining the query.\n\n\
        User Query: {query}\n\
        Retrieved Policies: {retrieved_policies}"
    )
}

/// Stage 6: compress only if overlong; never alter policy facts.
pub fn summarization_instruction(validated_response: &str) -> String {
    format!(
        "Summarize the validated response into a concise, structured format.\n\
        - Do not change policy details.\n\
        - Summarize only if the response is too long.\n\
        - If already clear, return as-is.\n\n\
        Validated Response: {validated_response}"
    )
}

/// Stage 7: classify intent, IT detection first.
pub fn feedback_instruction(user_response: &str, previous_response: &str) -> String {
    format!(
        "Analyze the following user response and determine the intent. \
        Always check for IT-related issues first before considering other intents.\n\n\
        Intent prioritization:\n\
        1. IT Issue - Prompt Ticket: if the response mentions an IT problem (e.g., password \
        reset, VPN issue, system failure), classify it as an IT issue and prompt ticket creation.\n\
        2. Satisfied: if no IT issue is found, check if the user is happy with the answer.\n\
        3. Refine: if no IT issue is found, determine if the user wants to refine or expand the answer.\n\
        4. New Question: if the user is asking about a different topic, classify it accordingly.\n\
        5. General Feedback: if the response is general feedback, classify it as such.\n\n\
        User Response: {user_response}\n\
        Previous Response: {previous_response}\n\n\
        Important: if the user mentions an IT-related issue (e.g., password reset, VPN, account \
        lockout), classify it as an IT issue before considering other intents.\n\
        Answer with exactly one of: 'IT Issue - Prompt Ticket', 'Satisfied', 'Refine', \
        'New Question', or 'General Feedback'."
    )
}

/// Ticket-drafting pipeline: one call, structured summary from the latest
/// query plus conversation context.
pub fn ticket_summary_instruction(query: &str, recent_queries: &str) -> String {
    format!(
        "Generate a structured IT support ticket summary using the user's latest query \
        and recent conversation context.\n\n\
        User's Latest Query: {query}\n\
        Recent Queries for Context: {recent_queries}\n\n\
        The summary should capture the issue comprehensively. The user will then select a \
        category from: 'Network Issue', 'Password Reset', 'Software Installation', \
        'Hardware Problem'."
    )
}
