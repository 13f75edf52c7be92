//! RCSB PDB provider (primary structural DB)
//!
//! Drives three RCSB surfaces: the search API (filter trees built by
//! [`crate::query`]), the GraphQL metadata endpoint (via
//! [`EnrichmentClient`]), and the coordinate file download host. The
//! search API answers an empty result set with 204 No Content rather
//! than an empty body.

use async_trait::async_trait;
use pdbq_common::types::{
    AnalysisCategory, AnalysisReport, DescriptorKind, DescriptorMatchMode, FacetBucket,
    LigandOccurrences, LigandQuery, SearchHit, SearchQuery, SearchResult, SimilarityMode,
    StructureId, StructureRecord,
};
use pdbq_common::{PdbqError, Result};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::RcsbConfig;
use crate::metadata::{EnrichmentClient, EntrySummary};
use crate::mmcif;
use crate::providers::{Capability, Provider, SimilarityCandidate};
use crate::query::{build_search_query, facet_attribute, FilterNode, SearchRequest};

const ATTR_COMP_ID: &str = "rcsb_chem_comp_container_identifiers.comp_id";
const ATTR_COMP_NAME: &str = "chem_comp.name";

pub struct RcsbProvider {
    client: reqwest::Client,
    enrichment: EnrichmentClient,
    search_url: String,
    files_url: String,
}

impl RcsbProvider {
    pub fn new(client: reqwest::Client, config: &RcsbConfig) -> Self {
        let enrichment = EnrichmentClient::new(client.clone(), config.graphql_url.clone());
        Self {
            client,
            enrichment,
            search_url: config.search_url.clone(),
            files_url: config.files_url.clone(),
        }
    }

    pub fn enrichment(&self) -> &EnrichmentClient {
        &self.enrichment
    }

    async fn execute_search(&self, request: &SearchRequest) -> Result<SearchResponseWire> {
        let response = self
            .client
            .post(&self.search_url)
            .json(request)
            .send()
            .await?;

        // No matches.
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(SearchResponseWire::default());
        }

        if !response.status().is_success() {
            return Err(PdbqError::ServiceUnavailable(format!(
                "search endpoint returned {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    /// Download the mmCIF coordinate file for one entry.
    async fn download_model(&self, id: &StructureId) -> Result<String> {
        let url = format!("{}/{}.cif", self.files_url, id);
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PdbqError::NotFound(format!(
                "no coordinate file for structure {id}"
            )));
        }
        if !response.status().is_success() {
            return Err(PdbqError::ServiceUnavailable(format!(
                "file download returned {}",
                response.status()
            )));
        }

        Ok(response.text().await?)
    }

    /// Turn identifiers from the search API into enriched hits, keeping
    /// result order. Enrichment failures degrade to bare hits.
    async fn enrich_hits(&self, wire_hits: &[WireHit]) -> Vec<SearchHit> {
        let ids: Vec<StructureId> = wire_hits
            .iter()
            .filter_map(|h| StructureId::parse(entry_part(&h.identifier)).ok())
            .collect();

        let summaries = match self.enrichment.entry_summaries(&ids).await {
            Ok(summaries) => summaries,
            Err(e) => {
                warn!(error = %e, "hit enrichment failed, returning bare identifiers");
                HashMap::new()
            },
        };

        ids.into_iter()
            .map(|id| {
                let summary = summaries.get(id.as_str()).cloned().unwrap_or_default();
                hit_from_summary(id, summary)
            })
            .collect()
    }
}

#[async_trait]
impl Provider for RcsbProvider {
    fn name(&self) -> &'static str {
        "rcsb"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[
            Capability::Search,
            Capability::GetStructure,
            Capability::TrackLigands,
            Capability::FindSimilar,
            Capability::Analyze,
        ]
    }

    async fn ping(&self) -> Result<()> {
        let probe = SearchRequest::entries(
            FilterNode::text(
                "rcsb_entry_info.polymer_entity_count_protein",
                "greater_or_equal",
                json!(1),
            ),
            1,
            0,
        );
        self.execute_search(&probe).await.map(|_| ())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        let request =
            SearchRequest::entries(build_search_query(query), query.limit, query.offset);
        let wire = self.execute_search(&request).await?;
        let hits = self.enrich_hits(&wire.result_set).await;
        Ok(SearchResult::page(hits, wire.total_count, query.offset))
    }

    async fn get_structure(&self, id: &StructureId) -> Result<StructureRecord> {
        // Metadata and coordinate file are independent; fetch both, then
        // merge. A failed download degrades to topology-unknown.
        let (metadata, model) =
            tokio::join!(self.enrichment.fetch_entry(id), self.download_model(id));

        let mut record = metadata?;

        let file_chains = match model {
            Ok(text) => mmcif::parse_chains(&text),
            Err(e) => {
                warn!(id = %id, error = %e, "coordinate file unavailable, chains from metadata only");
                Vec::new()
            },
        };

        record.chains = crate::metadata::merge_chain_sets(file_chains, record.chains);
        Ok(record)
    }

    async fn track_ligands(&self, query: &LigandQuery, limit: u32) -> Result<LigandOccurrences> {
        let (label, node) = ligand_filter(query)?;
        let request = SearchRequest::entries(node, limit, 0);
        let wire = self.execute_search(&request).await?;
        let structures = self.enrich_hits(&wire.result_set).await;

        Ok(LigandOccurrences {
            ligand: label,
            structures,
            total_count: wire.total_count,
        })
    }

    async fn similar_candidates(
        &self,
        reference: &StructureId,
        mode: SimilarityMode,
        limit: u32,
    ) -> Result<Vec<SimilarityCandidate>> {
        let node = match mode {
            SimilarityMode::Structure => FilterNode::service(
                "structure",
                json!({
                    "value": { "entry_id": reference.as_str(), "assembly_id": "1" },
                    "operator": "strict_shape_match",
                }),
            ),
            SimilarityMode::Sequence => {
                let record = self.enrichment.fetch_entry(reference).await?;
                let sequence = record
                    .chains
                    .iter()
                    .find_map(|c| c.sequence.clone())
                    .ok_or_else(|| {
                        PdbqError::Internal(format!(
                            "reference structure {reference} has no polymer sequence"
                        ))
                    })?;
                FilterNode::service(
                    "sequence",
                    json!({
                        "evalue_cutoff": 1,
                        "identity_cutoff": 0.25,
                        "sequence_type": "protein",
                        "value": sequence,
                    }),
                )
            },
        };

        // One extra row so dropping the reference itself still fills the
        // requested count.
        let request = SearchRequest::entries(node, limit + 1, 0);
        let wire = self.execute_search(&request).await?;

        let mut candidates = Vec::new();
        for hit in &wire.result_set {
            let Ok(id) = StructureId::parse(entry_part(&hit.identifier)) else {
                debug!(identifier = %hit.identifier, "skipping unparsable identifier");
                continue;
            };
            if &id == reference {
                continue;
            }

            let candidate = match mode {
                SimilarityMode::Structure => SimilarityCandidate {
                    id,
                    sequence_identity: None,
                    e_value: None,
                    shape_similarity: hit.score,
                },
                SimilarityMode::Sequence => {
                    let context = hit.first_match_context();
                    SimilarityCandidate {
                        id,
                        sequence_identity: context
                            .and_then(|c| c.sequence_identity)
                            .or(hit.score),
                        e_value: context.and_then(|c| c.evalue),
                        shape_similarity: None,
                    }
                },
            };
            candidates.push(candidate);

            if candidates.len() as u32 >= limit {
                break;
            }
        }

        Ok(candidates)
    }

    async fn analyze(
        &self,
        query: &SearchQuery,
        category: AnalysisCategory,
    ) -> Result<AnalysisReport> {
        let name = category_label(category);
        let request =
            SearchRequest::faceted(build_search_query(query), name, facet_attribute(category));
        let wire = self.execute_search(&request).await?;

        let buckets = wire
            .facets
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|f| f.buckets)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|b| {
                Some(FacetBucket {
                    value: b.label?,
                    count: b.population?,
                })
            })
            .collect();

        Ok(AnalysisReport {
            category,
            total_count: wire.total_count,
            buckets,
        })
    }
}

/// Strip an entity/assembly suffix (`1ABC_1`, `1ABC-1`) off a search
/// identifier.
fn entry_part(identifier: &str) -> &str {
    identifier
        .split(['_', '-', '.'])
        .next()
        .unwrap_or(identifier)
}

fn hit_from_summary(id: StructureId, summary: EntrySummary) -> SearchHit {
    SearchHit {
        id,
        title: summary.title,
        organisms: summary.organisms,
        method: summary.method,
        resolution: summary.resolution,
        release_date: summary.release_date,
    }
}

fn category_label(category: AnalysisCategory) -> &'static str {
    match category {
        AnalysisCategory::Fold => "fold",
        AnalysisCategory::Function => "function",
        AnalysisCategory::Organism => "organism",
        AnalysisCategory::Method => "method",
    }
}

/// Build the filter node and display label for a ligand query.
fn ligand_filter(query: &LigandQuery) -> Result<(String, FilterNode)> {
    match query {
        LigandQuery::ChemicalId { id } => {
            let id = id.trim();
            if id.is_empty() {
                return Err(PdbqError::Validation("chemical id must not be empty".into()));
            }
            Ok((
                id.to_ascii_uppercase(),
                FilterNode::text(ATTR_COMP_ID, "exact_match", json!(id.to_ascii_uppercase())),
            ))
        },
        LigandQuery::Name { name } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(PdbqError::Validation(
                    "chemical name must not be empty".into(),
                ));
            }
            Ok((
                name.to_string(),
                FilterNode::text(ATTR_COMP_NAME, "contains_phrase", json!(name)),
            ))
        },
        LigandQuery::Descriptor {
            descriptor,
            kind,
            match_mode,
        } => {
            let descriptor = descriptor.trim();
            if descriptor.is_empty() {
                return Err(PdbqError::Validation(
                    "chemical descriptor must not be empty".into(),
                ));
            }
            let descriptor_type = match kind {
                DescriptorKind::Smiles => "SMILES",
                DescriptorKind::InChI => "InChI",
            };
            let match_type = match match_mode {
                DescriptorMatchMode::GraphExact => "graph-exact",
                DescriptorMatchMode::GraphRelaxed => "graph-relaxed",
                DescriptorMatchMode::GraphRelaxedStereo => "graph-relaxed-stereo",
                DescriptorMatchMode::FingerprintSimilarity => "fingerprint-similarity",
            };
            Ok((
                descriptor.to_string(),
                FilterNode::service(
                    "chemical",
                    json!({
                        "value": descriptor,
                        "type": "descriptor",
                        "descriptor_type": descriptor_type,
                        "match_type": match_type,
                    }),
                ),
            ))
        },
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct SearchResponseWire {
    #[serde(default)]
    result_set: Vec<WireHit>,
    #[serde(default)]
    total_count: u64,
    facets: Option<Vec<WireFacet>>,
}

#[derive(Debug, Deserialize)]
struct WireHit {
    identifier: String,
    score: Option<f64>,
    services: Option<Vec<WireService>>,
}

impl WireHit {
    fn first_match_context(&self) -> Option<&WireMatchContext> {
        self.services
            .as_deref()?
            .iter()
            .filter_map(|s| s.nodes.as_deref())
            .flatten()
            .filter_map(|n| n.match_context.as_deref())
            .flatten()
            .next()
    }
}

#[derive(Debug, Deserialize)]
struct WireService {
    nodes: Option<Vec<WireNode>>,
}

#[derive(Debug, Deserialize)]
struct WireNode {
    match_context: Option<Vec<WireMatchContext>>,
}

#[derive(Debug, Deserialize)]
struct WireMatchContext {
    sequence_identity: Option<f64>,
    evalue: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WireFacet {
    #[allow(dead_code)]
    name: Option<String>,
    buckets: Option<Vec<WireBucket>>,
}

#[derive(Debug, Deserialize)]
struct WireBucket {
    label: Option<String>,
    population: Option<u64>,
}
