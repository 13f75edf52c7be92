//! Asynchronous structural-alignment job client
//!
//! The alignment computation is CPU-bound on a remote service, so it runs
//! as a submit/poll job: one submission request yields an opaque ticket,
//! then the client polls on a fixed interval up to a bounded attempt
//! count. The bound makes worst-case latency deterministic
//! (interval × attempts, 30s with defaults).
//!
//! State machine: SUBMITTED → RUNNING → {COMPLETE | ERROR}, with a
//! client-side TIMEOUT terminal state when the attempt budget runs out
//! before a terminal status is observed. A failed poll request is
//! transient: it is skipped and retried on the next tick, and never
//! counts as a terminal decision.

use pdbq_common::types::{AlignmentScores, StructureId};
use pdbq_common::{PdbqError, Result};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::AlignmentConfig;

/// Pairwise alignment algorithm requested from the compute service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignmentAlgorithm {
    Jce,
    JfatcatRigid,
    JfatcatFlexible,
    #[default]
    TmAlign,
}

impl AlignmentAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlignmentAlgorithm::Jce => "jce",
            AlignmentAlgorithm::JfatcatRigid => "jfatcat-rigid",
            AlignmentAlgorithm::JfatcatFlexible => "jfatcat-flexible",
            AlignmentAlgorithm::TmAlign => "tm-align",
        }
    }
}

impl std::str::FromStr for AlignmentAlgorithm {
    type Err = PdbqError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "jce" => Ok(AlignmentAlgorithm::Jce),
            "jfatcat-rigid" => Ok(AlignmentAlgorithm::JfatcatRigid),
            "jfatcat-flexible" => Ok(AlignmentAlgorithm::JfatcatFlexible),
            "tm-align" | "tmalign" => Ok(AlignmentAlgorithm::TmAlign),
            other => Err(PdbqError::Validation(format!(
                "unknown alignment algorithm: {other}"
            ))),
        }
    }
}

/// One structure+chain selection in a pairwise job.
#[derive(Debug, Clone)]
pub struct AlignmentTarget {
    pub id: StructureId,
    pub chain: Option<String>,
}

/// Client for the external pairwise alignment service.
#[derive(Clone)]
pub struct AlignmentClient {
    client: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
    max_attempts: u32,
}

enum PollOutcome {
    Running,
    Complete(AlignmentScores),
    Failed(String),
}

impl AlignmentClient {
    pub fn new(client: reqwest::Client, config: &AlignmentConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            poll_interval: config.poll_interval(),
            max_attempts: config.max_poll_attempts,
        }
    }

    /// Override poll timing; used by tests to avoid multi-second sleeps.
    pub fn with_timing(mut self, poll_interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = poll_interval;
        self.max_attempts = max_attempts;
        self
    }

    /// Submit one pairwise job and return the service-issued ticket.
    ///
    /// A non-2xx response is a terminal submission failure; no polling
    /// is attempted. The ticket is opaque and never interpreted.
    pub async fn submit(
        &self,
        a: &AlignmentTarget,
        b: &AlignmentTarget,
        algorithm: AlignmentAlgorithm,
    ) -> Result<String> {
        let body = json!({
            "query": {
                "context": {
                    "mode": "pairwise",
                    "method": { "name": algorithm.as_str() },
                    "structures": [selection(a), selection(b)],
                }
            },
            "options": { "return_sequence_data": false },
        });

        let response = self
            .client
            .post(format!("{}/submit", self.base_url))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PdbqError::ServiceUnavailable(format!(
                "alignment submission rejected with status {}",
                response.status()
            )));
        }

        let text = response.text().await?;
        let ticket = match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(value) => value
                .get("uuid")
                .and_then(|u| u.as_str())
                .map(String::from)
                .unwrap_or_else(|| text.trim().trim_matches('"').to_string()),
            Err(_) => text.trim().to_string(),
        };

        if ticket.is_empty() {
            return Err(PdbqError::Internal(
                "alignment service returned an empty job ticket".to_string(),
            ));
        }

        debug!(ticket = %ticket, "alignment job submitted");
        Ok(ticket)
    }

    /// Poll the ticket until a terminal state or the attempt budget is
    /// exhausted.
    pub async fn wait(&self, ticket: &str) -> Result<AlignmentScores> {
        for attempt in 1..=self.max_attempts {
            match self.poll(ticket).await {
                Ok(PollOutcome::Complete(scores)) => {
                    debug!(ticket, attempt, "alignment job completed");
                    return Ok(scores);
                },
                Ok(PollOutcome::Failed(message)) => {
                    return Err(PdbqError::ServiceUnavailable(format!(
                        "alignment job failed: {message}"
                    )));
                },
                Ok(PollOutcome::Running) => {},
                // Invariant violations are terminal; only transport
                // failures are transient.
                Err(e @ PdbqError::Internal(_)) => return Err(e),
                Err(e) => {
                    // Transient: does not consume a terminal decision.
                    warn!(ticket, attempt, error = %e, "alignment poll failed, retrying");
                },
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        Err(PdbqError::ServiceUnavailable(format!(
            "alignment job {ticket} timed out after {} polls",
            self.max_attempts
        )))
    }

    /// Submit and wait in one call.
    pub async fn align(
        &self,
        a: &AlignmentTarget,
        b: &AlignmentTarget,
        algorithm: AlignmentAlgorithm,
    ) -> Result<AlignmentScores> {
        let ticket = self.submit(a, b, algorithm).await?;
        self.wait(&ticket).await
    }

    async fn poll(&self, ticket: &str) -> Result<PollOutcome> {
        let response = self
            .client
            .get(format!("{}/results", self.base_url))
            .query(&[("uuid", ticket)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PdbqError::ServiceUnavailable(format!(
                "alignment results endpoint returned {}",
                response.status()
            )));
        }

        let payload: JobStatus = response.json().await?;
        let status = payload
            .info
            .as_ref()
            .and_then(|i| i.status.as_deref())
            .unwrap_or("RUNNING");

        match status {
            "COMPLETE" => {
                let Some(result) = payload.results.and_then(|r| r.into_iter().next()) else {
                    // COMPLETE with nothing to show violates the service
                    // contract; classify as a local invariant failure.
                    return Err(PdbqError::Internal(
                        "alignment job reported COMPLETE with an empty result payload".to_string(),
                    ));
                };
                Ok(PollOutcome::Complete(flatten_scores(&result)))
            },
            "ERROR" => {
                let message = payload
                    .info
                    .and_then(|i| i.message)
                    .unwrap_or_else(|| "no message".to_string());
                Ok(PollOutcome::Failed(message))
            },
            // Anything that is neither COMPLETE-with-results nor ERROR is
            // still RUNNING.
            _ => Ok(PollOutcome::Running),
        }
    }
}

fn selection(target: &AlignmentTarget) -> serde_json::Value {
    match &target.chain {
        Some(chain) => json!({
            "entry_id": target.id.as_str(),
            "selection": { "asym_id": chain },
        }),
        None => json!({ "entry_id": target.id.as_str() }),
    }
}

/// Flatten the named scalar score list into the fixed result shape.
///
/// Scores absent from the list stay `None`; zero is a meaningful RMSD
/// value and must never appear as a default.
fn flatten_scores(result: &JobResult) -> AlignmentScores {
    let mut scores = AlignmentScores::default();

    let Some(summary) = &result.summary else {
        return scores;
    };

    for score in summary.scores.as_deref().unwrap_or_default() {
        let Some(value) = score.value else { continue };
        match score.score_type.as_deref() {
            Some(t) if t.eq_ignore_ascii_case("RMSD") => scores.rmsd = Some(value),
            Some(t) if t.eq_ignore_ascii_case("TM-score") => scores.tm_score = Some(value),
            Some(t) if t.eq_ignore_ascii_case("sequence-identity") => {
                scores.sequence_identity = Some(value)
            },
            _ => {},
        }
    }

    scores.aligned_residues = summary.n_aln_residue_pairs;
    scores.query_length = summary
        .n_modeled_residues
        .as_deref()
        .and_then(|lengths| lengths.first().copied());

    scores
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct JobStatus {
    info: Option<JobInfo>,
    results: Option<Vec<JobResult>>,
}

#[derive(Debug, Deserialize)]
struct JobInfo {
    status: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobResult {
    summary: Option<JobSummary>,
}

#[derive(Debug, Deserialize)]
struct JobSummary {
    scores: Option<Vec<NamedScore>>,
    n_aln_residue_pairs: Option<u32>,
    n_modeled_residues: Option<Vec<u32>>,
}

#[derive(Debug, Deserialize)]
struct NamedScore {
    #[serde(rename = "type")]
    score_type: Option<String>,
    value: Option<f64>,
}
