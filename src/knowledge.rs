use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::llm::Embedder;

/// Matches returned per retrieval call.
const RESULT_COUNT: usize = 3;

/// A match is accepted only if its distance is strictly below this.
const DISTANCE_THRESHOLD: f32 = 0.5;

pub const NO_POLICY_FOUND: &str = "No relevant policy found.";

/// Built-in HR/IT policy knowledge base.
const KNOWLEDGE_BASE: &[(&str, &str)] = &[
    ("leave policy", "Employees are entitled to 20 annual leaves per year. Unused leaves cannot be carried over. Sick leave requires a medical certificate if taken for more than 2 consecutive days."),
    ("maternity leave", "Female employees are entitled to 26 weeks of paid maternity leave. Additional unpaid leave can be requested up to 16 weeks."),
    ("paternity leave", "Male employees can avail up to 2 weeks of paid paternity leave."),
    ("salary increments", "Annual salary increments are performance-based and reviewed every April. Employees with outstanding performance may receive additional bonuses."),
    ("promotion criteria", "Promotions are based on performance reviews, leadership potential, and business needs. Employees can apply for internal job postings after 1 year in their current role."),
    ("remote work policy", "Employees can work remotely up to 3 days a week. Fully remote positions require management approval."),
    ("overtime policy", "Employees working beyond 40 hours per week are eligible for overtime pay or compensatory time off, subject to approval."),
    ("health benefits", "Company provides full medical insurance to employees and dependents, covering hospitalization, consultation, and medications."),
    ("retirement plan", "Employees are enrolled in a company-sponsored retirement plan with a 5% employer contribution match."),
    ("password reset", "To reset your password, visit the IT portal and click 'Forgot Password'. If locked out, contact IT Support."),
    ("vpn issue", "Ensure your VPN software is updated. If issues persist, restart your computer and reconnect."),
    ("email access issue", "If you cannot access your email, reset your password via the email portal. If issues persist, check Outlook settings."),
    ("software installation", "Submit a request through the IT Helpdesk for software installation. Approval from your manager may be required."),
    ("printer not working", "Ensure the printer is powered on and connected. If issues persist, reinstall the drivers or contact IT support."),
    ("incident reporting", "Employees must report security breaches within 24 hours to the IT Security Team."),
    ("firewall rules", "Strict firewall rules are enforced to block unauthorized access to company systems."),
];

/// A candidate policy with its distance from the query embedding.
/// Lower distance = more relevant.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyMatch {
    pub text: String,
    pub distance: f32,
}

/// Retrieval seam the pipeline depends on. Returns the assembled,
/// user-facing retrieval text (no match / verbatim match / multi-match).
#[async_trait]
pub trait PolicyRetriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> String;
}

struct IndexedPolicy {
    key: String,
    text: String,
    embedding: Vec<f32>,
}

/// In-process nearest-neighbor index over the built-in policies.
pub struct PolicyIndex {
    embedder: Arc<dyn Embedder>,
    policies: Vec<IndexedPolicy>,
}

impl PolicyIndex {
    /// Embed every policy once. A failed embedding (zero vector) is kept but
    /// can never match, so a flaky provider at startup degrades that policy
    /// to unsearchable rather than failing the boot.
    pub async fn build(embedder: Arc<dyn Embedder>) -> Self {
        let embeddings = join_all(
            KNOWLEDGE_BASE
                .iter()
                .map(|(_, text)| embedder.embed(text)),
        )
        .await;

        let mut policies = Vec::with_capacity(KNOWLEDGE_BASE.len());
        for ((key, text), embedding) in KNOWLEDGE_BASE.iter().zip(embeddings) {
            if is_zero(&embedding) {
                warn!(policy = key, "Policy indexed without embedding, it will never match");
            }
            policies.push(IndexedPolicy {
                key: key.to_string(),
                text: text.to_string(),
                embedding,
            });
        }

        info!(count = policies.len(), "Policy knowledge base indexed");
        Self { embedder, policies }
    }

    /// Nearest neighbors by ascending cosine distance, up to `count`.
    /// Zero-norm entries are skipped.
    fn nearest(&self, query_embedding: &[f32], count: usize) -> Vec<PolicyMatch> {
        let mut scored: Vec<(f32, &IndexedPolicy)> = self
            .policies
            .iter()
            .filter_map(|p| {
                cosine_distance(query_embedding, &p.embedding).map(|d| (d, p))
            })
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        scored
            .into_iter()
            .take(count)
            .map(|(distance, p)| {
                debug!(policy = %p.key, distance, "Candidate match");
                PolicyMatch {
                    text: p.text.clone(),
                    distance,
                }
            })
            .collect()
    }
}

#[async_trait]
impl PolicyRetriever for PolicyIndex {
    async fn retrieve(&self, query: &str) -> String {
        info!(query, "Searching policy knowledge base");

        let query_embedding = self.embedder.embed(query).await;
        if is_zero(&query_embedding) {
            warn!(query, "Query embedding unavailable, skipping search");
            return NO_POLICY_FOUND.to_string();
        }

        let candidates = self.nearest(&query_embedding, RESULT_COUNT);
        let accepted = accept_matches(&candidates);
        assemble_response(&accepted)
    }
}

fn is_zero(v: &[f32]) -> bool {
    v.iter().all(|x| *x == 0.0)
}

/// Cosine distance (1 - cosine similarity). `None` if either vector has
/// zero norm.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(1.0 - dot / (norm_a * norm_b))
}

/// Keep only matches strictly below the acceptance threshold, preserving
/// the ascending-distance order of the input.
pub fn accept_matches(candidates: &[PolicyMatch]) -> Vec<&PolicyMatch> {
    candidates
        .iter()
        .filter(|m| m.distance < DISTANCE_THRESHOLD)
        .collect()
}

/// Turn accepted matches into the user-facing retrieval text.
pub fn assemble_response(accepted: &[&PolicyMatch]) -> String {
    match accepted {
        [] => NO_POLICY_FOUND.to_string(),
        [only] => only.text.clone(),
        many => {
            let joined = many
                .iter()
                .map(|m| m.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");
            format!(
                "I found multiple relevant policies:\n\n{}\n\nWould you like to refine your query?",
                joined
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(text: &str, distance: f32) -> PolicyMatch {
        PolicyMatch {
            text: text.to_string(),
            distance,
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        let candidates = vec![m("at threshold", 0.5), m("just under", 0.4999)];
        let accepted = accept_matches(&candidates);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].text, "just under");
    }

    #[test]
    fn test_no_accepted_matches() {
        let candidates = vec![m("weak", 0.8), m("weaker", 0.9)];
        let accepted = accept_matches(&candidates);
        assert_eq!(assemble_response(&accepted), "No relevant policy found.");
    }

    #[test]
    fn test_single_match_verbatim() {
        let candidates = vec![m("Employees are entitled to 20 annual leaves per year.", 0.2)];
        let accepted = accept_matches(&candidates);
        assert_eq!(
            assemble_response(&accepted),
            "Employees are entitled to 20 annual leaves per year."
        );
    }

    #[test]
    fn test_multiple_matches_keep_store_order() {
        let candidates = vec![m("first", 0.1), m("second", 0.2), m("third", 0.3)];
        let accepted = accept_matches(&candidates);
        assert_eq!(
            assemble_response(&accepted),
            "I found multiple relevant policies:\n\nfirst\n\nsecond\n\nthird\n\nWould you like to refine your query?"
        );
    }

    #[test]
    fn test_cosine_distance() {
        let a = [1.0, 0.0];
        assert_eq!(cosine_distance(&a, &[1.0, 0.0]), Some(0.0));
        assert_eq!(cosine_distance(&a, &[0.0, 1.0]), Some(1.0));
        assert_eq!(cosine_distance(&a, &[-1.0, 0.0]), Some(2.0));
        // Zero-norm vectors never match
        assert_eq!(cosine_distance(&a, &[0.0, 0.0]), None);
    }

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, text: &str) -> Vec<f32> {
            // Orthogonal axes per topic so the test controls distances
            if text.contains("annual leaves") || text.contains("leave") {
                vec![1.0, 0.0, 0.0]
            } else if text.contains("VPN") || text.contains("vpn") {
                vec![0.0, 1.0, 0.0]
            } else {
                vec![0.0, 0.0, 1.0]
            }
        }
    }

    #[tokio::test]
    async fn test_index_retrieves_exact_topic() {
        let index = PolicyIndex::build(Arc::new(FixedEmbedder)).await;
        let response = index.retrieve("What is my leave policy?").await;
        assert!(response.contains("20 annual leaves"));
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Vec<f32> {
            vec![0.0; 4]
        }
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_to_no_policy() {
        let index = PolicyIndex::build(Arc::new(FailingEmbedder)).await;
        let response = index.retrieve("anything").await;
        assert_eq!(response, "No relevant policy found.");
    }
}
