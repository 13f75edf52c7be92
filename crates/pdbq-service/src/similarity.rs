//! Similarity ranking and merge
//!
//! Turns a provider candidate list into ranked [`SimilarityHit`]s.
//! Sequence mode is cheap: the upstream search already scored every
//! candidate, so the merger only enriches and sorts. Structure mode runs
//! one pairwise alignment job per candidate, concurrently, with a
//! partial-failure-tolerant join: failed alignments are logged and
//! dropped, and an all-failed batch yields an empty result rather than
//! an error; similarity is a best-effort signal.

use futures::future::join_all;
use pdbq_common::types::{
    AlignmentScores, SimilarityHit, SimilarityMode, StructureId,
};
use pdbq_common::Result;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::warn;

use crate::alignment::{AlignmentAlgorithm, AlignmentClient, AlignmentTarget};
use crate::metadata::{EnrichmentClient, EntrySummary};
use crate::providers::SimilarityCandidate;

/// Hard ceiling on concurrent alignment jobs per batch; bounds the total
/// alignment cost no matter what limit the caller asks for.
pub const MAX_ALIGNMENT_CANDIDATES: usize = 10;

pub struct SimilarityMerger {
    alignment: AlignmentClient,
    enrichment: EnrichmentClient,
}

impl SimilarityMerger {
    pub fn new(alignment: AlignmentClient, enrichment: EnrichmentClient) -> Self {
        Self {
            alignment,
            enrichment,
        }
    }

    /// Rank candidates against the reference structure.
    pub async fn rank(
        &self,
        reference: &StructureId,
        reference_chain: Option<&str>,
        mode: SimilarityMode,
        candidates: Vec<SimilarityCandidate>,
        limit: u32,
        algorithm: AlignmentAlgorithm,
    ) -> Result<Vec<SimilarityHit>> {
        match mode {
            SimilarityMode::Sequence => {
                let capped: Vec<_> = candidates.into_iter().take(limit as usize).collect();
                let summaries = self.summaries_for(&capped).await;
                Ok(rank_sequence_hits(capped, &summaries))
            },
            SimilarityMode::Structure => {
                let cap = (limit as usize).min(MAX_ALIGNMENT_CANDIDATES);
                let capped: Vec<_> = candidates.into_iter().take(cap).collect();

                let reference_target = AlignmentTarget {
                    id: reference.clone(),
                    chain: reference_chain.map(String::from),
                };

                // One job per candidate, all in flight at once; every
                // outcome is collected, success or failure.
                let jobs = capped.into_iter().map(|candidate| {
                    let target = AlignmentTarget {
                        id: candidate.id.clone(),
                        chain: None,
                    };
                    let reference_target = reference_target.clone();
                    async move {
                        let outcome = self
                            .alignment
                            .align(&reference_target, &target, algorithm)
                            .await;
                        (candidate, outcome)
                    }
                });

                let mut survivors = Vec::new();
                for (candidate, outcome) in join_all(jobs).await {
                    match outcome {
                        Ok(scores) => survivors.push((candidate, scores)),
                        Err(e) => {
                            warn!(candidate = %candidate.id, error = %e,
                                "pairwise alignment failed, excluding candidate");
                        },
                    }
                }

                let summaries = self
                    .summaries_for_pairs(&survivors)
                    .await;
                Ok(rank_structure_hits(survivors, &summaries))
            },
        }
    }

    async fn summaries_for(
        &self,
        candidates: &[SimilarityCandidate],
    ) -> HashMap<String, EntrySummary> {
        let ids: Vec<StructureId> = candidates.iter().map(|c| c.id.clone()).collect();
        self.fetch_summaries(&ids).await
    }

    async fn summaries_for_pairs(
        &self,
        survivors: &[(SimilarityCandidate, AlignmentScores)],
    ) -> HashMap<String, EntrySummary> {
        let ids: Vec<StructureId> = survivors.iter().map(|(c, _)| c.id.clone()).collect();
        self.fetch_summaries(&ids).await
    }

    async fn fetch_summaries(&self, ids: &[StructureId]) -> HashMap<String, EntrySummary> {
        match self.enrichment.entry_summaries(ids).await {
            Ok(summaries) => summaries,
            Err(e) => {
                warn!(error = %e, "similarity enrichment failed, hits stay bare");
                HashMap::new()
            },
        }
    }
}

/// Sequence mode: relevance scores are already per-candidate; map them
/// onto `sequence_identity`, enrich, and sort.
fn rank_sequence_hits(
    candidates: Vec<SimilarityCandidate>,
    summaries: &HashMap<String, EntrySummary>,
) -> Vec<SimilarityHit> {
    let mut hits: Vec<SimilarityHit> = candidates
        .into_iter()
        .map(|candidate| {
            let summary = summaries.get(candidate.id.as_str()).cloned().unwrap_or_default();
            SimilarityHit {
                id: candidate.id,
                title: summary.title,
                organisms: summary.organisms,
                sequence_identity: candidate.sequence_identity,
                e_value: candidate.e_value,
                tm_score: None,
                rmsd: None,
                shape_similarity: None,
                coverage: None,
            }
        })
        .collect();

    // Stable sort: ties keep input order.
    hits.sort_by(|a, b| {
        b.sequence_identity
            .partial_cmp(&a.sequence_identity)
            .unwrap_or(Ordering::Equal)
    });
    hits
}

/// Structure mode: fold alignment scores into hits and rank by TM-score.
fn rank_structure_hits(
    survivors: Vec<(SimilarityCandidate, AlignmentScores)>,
    summaries: &HashMap<String, EntrySummary>,
) -> Vec<SimilarityHit> {
    let mut hits: Vec<SimilarityHit> = survivors
        .into_iter()
        .map(|(candidate, scores)| {
            let summary = summaries.get(candidate.id.as_str()).cloned().unwrap_or_default();
            let coverage = match (scores.aligned_residues, scores.query_length) {
                (Some(aligned), Some(len)) if len > 0 => {
                    Some(aligned as f64 / len as f64 * 100.0)
                },
                _ => None,
            };
            SimilarityHit {
                id: candidate.id,
                title: summary.title,
                organisms: summary.organisms,
                sequence_identity: scores.sequence_identity,
                e_value: None,
                tm_score: scores.tm_score,
                rmsd: scores.rmsd,
                shape_similarity: candidate.shape_similarity,
                coverage,
            }
        })
        .collect();

    hits.sort_by(|a, b| b.tm_score.partial_cmp(&a.tm_score).unwrap_or(Ordering::Equal));
    hits
}
