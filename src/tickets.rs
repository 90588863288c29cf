use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Categories offered at ticket creation. The store trusts the caller's
/// category as-is rather than re-validating it (known gap, kept on purpose).
pub const ISSUE_CATEGORIES: [&str; 4] = [
    "Network Issue",
    "Password Reset",
    "Software Installation",
    "Hardware Problem",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub ticket_id: String,
    pub issue_summary: String,
    pub issue_category: String,
    pub status: String,
}

/// Append-only ticket file: a JSON array of records, rewritten in full on
/// every append. The file is the single source of truth — nothing is cached
/// between calls. The mutex makes the read-then-append atomic, so ids stay
/// strictly increasing under concurrent requests.
pub struct TicketStore {
    path: PathBuf,
    append_lock: Mutex<()>,
}

impl TicketStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append_lock: Mutex::new(()),
        }
    }

    pub fn from_env() -> Self {
        let path = dotenv::var("TICKET_FILE").unwrap_or_else(|_| "tickets.json".to_string());
        Self::new(path)
    }

    /// Load all tickets in insertion order. A missing or malformed file
    /// means no tickets exist.
    pub fn load(&self) -> Vec<TicketRecord> {
        load_tickets(&self.path)
    }

    /// Create a ticket with the next sequential id and persist it.
    pub async fn create(&self, issue_summary: &str, issue_category: &str) -> Result<TicketRecord> {
        let _guard = self.append_lock.lock().await;

        let mut tickets = load_tickets(&self.path);
        let ticket = TicketRecord {
            ticket_id: format!("TCK-{:04}", tickets.len() + 1),
            issue_summary: issue_summary.to_string(),
            issue_category: issue_category.to_string(),
            status: "Open".to_string(),
        };
        tickets.push(ticket.clone());

        let json = serde_json::to_string_pretty(&tickets).context("serialize tickets")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("write ticket file {:?}", self.path))?;

        info!(ticket_id = %ticket.ticket_id, category = %ticket.issue_category, "Ticket created");
        Ok(ticket)
    }
}

fn load_tickets(path: &Path) -> Vec<TicketRecord> {
    let Ok(bytes) = std::fs::read(path) else {
        return Vec::new();
    };
    match serde_json::from_slice::<Vec<TicketRecord>>(&bytes) {
        Ok(tickets) => tickets,
        Err(e) => {
            warn!(?path, error = %e, "Malformed ticket file, treating as empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ids_sequential_and_zero_padded() {
        let dir = tempfile::tempdir().unwrap();
        let store = TicketStore::new(dir.path().join("tickets.json"));

        let first = store.create("VPN down", "Network Issue").await.unwrap();
        assert_eq!(first.ticket_id, "TCK-0001");
        assert_eq!(first.status, "Open");

        for _ in 0..9 {
            store.create("another issue", "Hardware Problem").await.unwrap();
        }
        let eleventh = store.create("locked out", "Password Reset").await.unwrap();
        assert_eq!(eleventh.ticket_id, "TCK-0011");
    }

    #[tokio::test]
    async fn test_round_trip_preserves_order_and_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.json");

        let store = TicketStore::new(&path);
        store.create("first summary", "Network Issue").await.unwrap();
        store.create("second summary", "Software Installation").await.unwrap();
        store.create("third summary", "Hardware Problem").await.unwrap();

        // A fresh store over the same file sees exactly what was written
        let reloaded = TicketStore::new(&path).load();
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded[0].ticket_id, "TCK-0001");
        assert_eq!(reloaded[0].issue_summary, "first summary");
        assert_eq!(reloaded[1].issue_category, "Software Installation");
        assert_eq!(reloaded[2].ticket_id, "TCK-0003");
        assert!(reloaded.iter().all(|t| t.status == "Open"));
    }

    #[tokio::test]
    async fn test_malformed_file_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = TicketStore::new(&path);
        assert!(store.load().is_empty());

        // Creation restarts the sequence from a clean slate
        let ticket = store.create("summary", "Network Issue").await.unwrap();
        assert_eq!(ticket.ticket_id, "TCK-0001");
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TicketStore::new(dir.path().join("absent.json"));
        assert!(store.load().is_empty());
    }
}
