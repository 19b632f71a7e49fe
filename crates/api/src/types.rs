// crates/api/src/types.rs
//! Wire types for the digest service, mirroring the backend schemas.

use serde::{Deserialize, Serialize};

/// Status string for a completed digest job.
pub const STATUS_COMPLETED: &str = "completed";
/// Status string for a digest job that failed server-side.
pub const STATUS_FAILED: &str = "failed";

/// Body for `POST /v1/digest/job`.
#[derive(Debug, Clone, Serialize)]
pub struct NewDigestRequest {
    pub user_id: String,
    pub protease: String,
    pub protein_name: String,
    pub sequence: String,
}

/// Response from `POST /v1/digest/job`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDigestResponse {
    pub digest_id: String,
}

/// One digest job as the server reports it.
///
/// `status` is server-authoritative and kept as a raw string so that unknown
/// values degrade to "still in progress" instead of a decode failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestResponse {
    pub id: String,
    pub status: String,
    pub user_id: String,
    pub protease: String,
    pub protein_name: Option<String>,
    pub sequence: String,
    pub created_at: String,
    pub updated_at: String,
}

impl DigestResponse {
    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }

    pub fn is_failed(&self) -> bool {
        self.status == STATUS_FAILED
    }

    /// Terminal means no further status change will occur.
    pub fn is_terminal(&self) -> bool {
        self.is_completed() || self.is_failed()
    }
}

/// One evaluation rule in the criteria catalog. Catalog order is the
/// authoritative display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaResponse {
    pub code: String,
    pub goal: String,
    pub rationale: String,
    pub rank: u32,
}

/// One scored peptide. `criteria_ranks` references entries of the criteria
/// catalog by their `rank`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeptideResponse {
    pub id: String,
    pub sequence: String,
    pub position: u32,
    pub pi: Option<f64>,
    pub charge_state: Option<f64>,
    pub max_kd_score: Option<f64>,
    pub rank: u32,
    pub criteria_ranks: Vec<u32>,
}

/// The result set fetched once a digest reaches `completed`. An empty
/// `peptides` list is a valid outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestPeptidesResponse {
    pub digest_id: String,
    pub peptides: Vec<PeptideResponse>,
    pub criteria: Vec<CriteriaResponse>,
}
