/// Typed results parsed out of free-text generator output. The pipeline
/// branches on these, never on raw strings.

/// Outcome of the query-refinement stage.
#[derive(Debug, Clone, PartialEq)]
pub enum RefinementOutcome {
    /// The model asked a question back; pipeline halts for this turn.
    Clarification(String),
    /// A refined (or unchanged) query ready for retrieval.
    Refined(String),
}

impl RefinementOutcome {
    /// A refinement output is a clarification question iff its trimmed
    /// text ends with `?`.
    pub fn parse(output: &str) -> Self {
        let trimmed = output.trim();
        if trimmed.ends_with('?') {
            RefinementOutcome::Clarification(trimmed.to_string())
        } else {
            RefinementOutcome::Refined(trimmed.to_string())
        }
    }
}

/// Classified user-turn intent. Exactly one label per classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackIntent {
    /// IT problem detected; prompt the user to open a ticket.
    ItIssue,
    Satisfied,
    Refine,
    NewQuestion,
    General,
}

impl FeedbackIntent {
    /// Map the classifier's free text onto the closed intent set.
    ///
    /// IT detection is checked first, matching the classifier's own
    /// prioritization. The generator is not guaranteed to emit the label
    /// tokens exactly, so this stays a substring match (known fragility);
    /// anything unrecognized falls through to General.
    pub fn parse(output: &str) -> Self {
        if output.contains("IT Issue - Prompt Ticket") {
            FeedbackIntent::ItIssue
        } else if output.contains("Satisfied") {
            FeedbackIntent::Satisfied
        } else if output.contains("Refine") {
            FeedbackIntent::Refine
        } else if output.contains("New Question") {
            FeedbackIntent::NewQuestion
        } else {
            FeedbackIntent::General
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_question_mark_is_clarification() {
        let outcome = RefinementOutcome::parse("Do you mean annual leave or sick leave?");
        assert_eq!(
            outcome,
            RefinementOutcome::Clarification(
                "Do you mean annual leave or sick leave?".to_string()
            )
        );
    }

    #[test]
    fn test_trailing_whitespace_still_detected() {
        let outcome = RefinementOutcome::parse("Which VPN client are you using?  \n");
        assert!(matches!(outcome, RefinementOutcome::Clarification(_)));
    }

    #[test]
    fn test_statement_is_refined_query() {
        let outcome = RefinementOutcome::parse("annual leave entitlement policy");
        assert_eq!(
            outcome,
            RefinementOutcome::Refined("annual leave entitlement policy".to_string())
        );
    }

    #[test]
    fn test_question_mark_mid_text_is_not_clarification() {
        let outcome = RefinementOutcome::parse("leave policy? details and entitlements");
        assert!(matches!(outcome, RefinementOutcome::Refined(_)));
    }

    #[test]
    fn test_it_issue_takes_priority() {
        // Classifier may mention several labels; IT wins
        let intent =
            FeedbackIntent::parse("IT Issue - Prompt Ticket (user seems otherwise Satisfied)");
        assert_eq!(intent, FeedbackIntent::ItIssue);
    }

    #[test]
    fn test_known_labels() {
        assert_eq!(FeedbackIntent::parse("Satisfied"), FeedbackIntent::Satisfied);
        assert_eq!(FeedbackIntent::parse("Refine"), FeedbackIntent::Refine);
        assert_eq!(
            FeedbackIntent::parse("New Question"),
            FeedbackIntent::NewQuestion
        );
        assert_eq!(
            FeedbackIntent::parse("General Feedback"),
            FeedbackIntent::General
        );
    }

    #[test]
    fn test_unrecognized_output_is_general() {
        assert_eq!(
            FeedbackIntent::parse("The user appears content with the answer."),
            FeedbackIntent::General
        );
    }
}
