//! Structured metadata enrichment
//!
//! Fetches entry-level metadata (title, experimental statistics,
//! citations, per-entity organism/sequence) from the RCSB GraphQL
//! endpoint and merges it with chains recovered from the coordinate
//! file. Upstream "entry is null" responses classify as `NotFound`,
//! distinct from transport failures, so the orchestrator knows when a
//! mirror retry is pointless.

use pdbq_common::types::{merge_chain, Chain, Citation, StructureId, StructureRecord};
use pdbq_common::{PdbqError, Result};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;

use crate::mmcif;

const ENTRY_QUERY: &str = r#"
query Entry($id: String!) {
  entry(entry_id: $id) {
    struct { title }
    exptl { method }
    rcsb_entry_info { resolution_combined }
    refine { ls_R_factor_R_work ls_R_factor_R_free }
    symmetry { space_group_name_H_M }
    cell { length_a length_b length_c angle_alpha angle_beta angle_gamma }
    citation { title rcsb_authors journal_abbrev year pdbx_database_id_DOI }
    polymer_entities {
      entity_poly { type pdbx_strand_id pdbx_seq_one_letter_code_can }
      rcsb_entity_source_organism { scientific_name }
    }
  }
}
"#;

const SUMMARIES_QUERY: &str = r#"
query Summaries($ids: [String!]!) {
  entries(entry_ids: $ids) {
    rcsb_id
    struct { title }
    exptl { method }
    rcsb_entry_info { resolution_combined }
    rcsb_accession_info { initial_release_date }
    polymer_entities {
      rcsb_entity_source_organism { scientific_name }
    }
  }
}
"#;

/// Per-entry capsule used to enrich search and similarity hits.
#[derive(Debug, Clone, Default)]
pub struct EntrySummary {
    pub title: Option<String>,
    pub organisms: Vec<String>,
    pub method: Option<String>,
    pub resolution: Option<f64>,
    pub release_date: Option<chrono::NaiveDate>,
}

/// GraphQL metadata client over the shared HTTP handle.
#[derive(Clone)]
pub struct EnrichmentClient {
    client: reqwest::Client,
    graphql_url: String,
}

impl EnrichmentClient {
    pub fn new(client: reqwest::Client, graphql_url: String) -> Self {
        Self { client, graphql_url }
    }

    /// Fetch a full metadata record for one validated entry id.
    ///
    /// The returned record carries metadata-derived chains only; callers
    /// merge file-derived chains via [`merge_chain_sets`].
    pub async fn fetch_entry(&self, id: &StructureId) -> Result<StructureRecord> {
        let body = json!({
            "query": ENTRY_QUERY,
            "variables": { "id": id.as_str() },
        });

        let response = self
            .client
            .post(&self.graphql_url)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PdbqError::ServiceUnavailable(format!(
                "metadata endpoint returned {}",
                response.status()
            )));
        }

        let payload: GraphqlResponse<EntryData> = response.json().await?;
        if let Some(errors) = payload.errors.filter(|e| !e.is_empty()) {
            debug!(?errors, "GraphQL errors in entry response");
            return Err(PdbqError::ServiceUnavailable(
                "metadata query was rejected upstream".to_string(),
            ));
        }

        let entry = payload
            .data
            .and_then(|d| d.entry)
            .ok_or_else(|| PdbqError::NotFound(format!("structure {id} does not exist")))?;

        Ok(build_record(id.clone(), entry))
    }

    /// Fetch titles and organisms for a batch of ids in one call.
    ///
    /// Best-effort: ids missing upstream are simply absent from the map.
    pub async fn entry_summaries(
        &self,
        ids: &[StructureId],
    ) -> Result<HashMap<String, EntrySummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let id_strings: Vec<&str> = ids.iter().map(StructureId::as_str).collect();
        let body = json!({
            "query": SUMMARIES_QUERY,
            "variables": { "ids": id_strings },
        });

        let response = self
            .client
            .post(&self.graphql_url)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PdbqError::ServiceUnavailable(format!(
                "metadata endpoint returned {}",
                response.status()
            )));
        }

        let payload: GraphqlResponse<EntriesData> = response.json().await?;
        let entries = payload
            .data
            .map(|d| d.entries)
            .unwrap_or_default();

        let mut summaries = HashMap::new();
        for entry in entries {
            let Some(id) = entry.rcsb_id else { continue };
            let release_date = entry
                .rcsb_accession_info
                .and_then(|a| a.initial_release_date)
                .and_then(|d| d.get(..10).and_then(|p| p.parse().ok()));
            summaries.insert(
                id.to_ascii_uppercase(),
                EntrySummary {
                    title: entry.struct_info.and_then(|s| s.title),
                    organisms: collect_organisms(entry.polymer_entities.as_deref()),
                    method: entry
                        .exptl
                        .and_then(|e| e.into_iter().next())
                        .and_then(|e| e.method),
                    resolution: entry
                        .rcsb_entry_info
                        .and_then(|i| i.resolution_combined)
                        .and_then(|r| r.into_iter().next()),
                    release_date,
                },
            );
        }
        Ok(summaries)
    }
}

/// Merge file-derived and metadata-derived chains into one ordered list.
///
/// File order is preserved for chains present in the file; chains known
/// only to the metadata are appended in metadata order. Field precedence
/// is [`merge_chain`]'s.
pub fn merge_chain_sets(file_chains: Vec<Chain>, meta_chains: Vec<Chain>) -> Vec<Chain> {
    let mut merged = Vec::with_capacity(file_chains.len().max(meta_chains.len()));

    for file_chain in &file_chains {
        let meta_match = meta_chains.iter().find(|m| m.id == file_chain.id);
        if let Some(chain) = merge_chain(Some(file_chain), meta_match) {
            merged.push(chain);
        }
    }

    for meta_chain in meta_chains {
        if !file_chains.iter().any(|f| f.id == meta_chain.id) {
            merged.push(meta_chain);
        }
    }

    merged
}

fn build_record(id: StructureId, entry: EntryFields) -> StructureRecord {
    let resolution = entry
        .rcsb_entry_info
        .and_then(|i| i.resolution_combined)
        .and_then(|r| r.into_iter().next());

    let refine = entry.refine.and_then(|r| r.into_iter().next());
    let (r_factor, r_free) = match refine {
        Some(r) => (r.ls_r_factor_r_work, r.ls_r_factor_r_free),
        None => (None, None),
    };

    let unit_cell = entry.cell.and_then(|c| {
        Some([
            c.length_a?,
            c.length_b?,
            c.length_c?,
            c.angle_alpha?,
            c.angle_beta?,
            c.angle_gamma?,
        ])
    });

    let citations = entry
        .citation
        .unwrap_or_default()
        .into_iter()
        .map(|c| Citation {
            title: c.title,
            authors: c.rcsb_authors.unwrap_or_default(),
            journal: c.journal_abbrev,
            year: c.year,
            doi: c.pdbx_database_id_doi,
        })
        .collect();

    let chains = metadata_chains(entry.polymer_entities.as_deref());

    StructureRecord {
        id,
        title: entry.struct_info.and_then(|s| s.title),
        method: entry
            .exptl
            .and_then(|e| e.into_iter().next())
            .and_then(|e| e.method),
        resolution,
        r_factor,
        r_free,
        space_group: entry.symmetry.and_then(|s| s.space_group_name_h_m),
        unit_cell,
        chains,
        citations,
    }
}

/// Expand entity-level metadata into per-chain entries.
fn metadata_chains(entities: Option<&[PolymerEntity]>) -> Vec<Chain> {
    let mut chains = Vec::new();
    for entity in entities.unwrap_or_default() {
        let Some(poly) = &entity.entity_poly else { continue };
        let kind = poly
            .type_name
            .as_deref()
            .map(mmcif::entity_kind)
            .unwrap_or(pdbq_common::types::ChainKind::Protein);
        let sequence = poly
            .pdbx_seq_one_letter_code_can
            .as_deref()
            .map(|s| s.chars().filter(|c| !c.is_whitespace()).collect::<String>())
            .filter(|s: &String| !s.is_empty());
        let length = sequence.as_deref().map(str::len).unwrap_or(0);
        let organism = entity
            .rcsb_entity_source_organism
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find_map(|o| o.scientific_name.clone());

        for id in mmcif::split_strand_ids(poly.pdbx_strand_id.as_deref().unwrap_or("")) {
            chains.push(Chain {
                id,
                kind,
                sequence: sequence.clone(),
                length,
                organism: organism.clone(),
            });
        }
    }
    chains
}

fn collect_organisms(entities: Option<&[PolymerEntity]>) -> Vec<String> {
    let mut organisms: Vec<String> = Vec::new();
    for entity in entities.unwrap_or_default() {
        for source in entity.rcsb_entity_source_organism.as_deref().unwrap_or_default() {
            if let Some(name) = &source.scientific_name {
                if !organisms.contains(name) {
                    organisms.push(name.clone());
                }
            }
        }
    }
    organisms
}

// ============================================================================
// GraphQL wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct EntryData {
    entry: Option<EntryFields>,
}

#[derive(Debug, Deserialize)]
struct EntriesData {
    #[serde(default)]
    entries: Vec<EntrySummaryFields>,
}

#[derive(Debug, Deserialize)]
struct EntryFields {
    #[serde(rename = "struct")]
    struct_info: Option<StructInfo>,
    exptl: Option<Vec<Exptl>>,
    rcsb_entry_info: Option<EntryInfo>,
    refine: Option<Vec<Refine>>,
    symmetry: Option<Symmetry>,
    cell: Option<Cell>,
    citation: Option<Vec<CitationFields>>,
    polymer_entities: Option<Vec<PolymerEntity>>,
}

#[derive(Debug, Deserialize)]
struct EntrySummaryFields {
    rcsb_id: Option<String>,
    #[serde(rename = "struct")]
    struct_info: Option<StructInfo>,
    exptl: Option<Vec<Exptl>>,
    rcsb_entry_info: Option<EntryInfo>,
    rcsb_accession_info: Option<AccessionInfo>,
    polymer_entities: Option<Vec<PolymerEntity>>,
}

#[derive(Debug, Deserialize)]
struct AccessionInfo {
    initial_release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StructInfo {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Exptl {
    method: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EntryInfo {
    resolution_combined: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct Refine {
    #[serde(rename = "ls_R_factor_R_work")]
    ls_r_factor_r_work: Option<f64>,
    #[serde(rename = "ls_R_factor_R_free")]
    ls_r_factor_r_free: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Symmetry {
    #[serde(rename = "space_group_name_H_M")]
    space_group_name_h_m: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    length_a: Option<f64>,
    length_b: Option<f64>,
    length_c: Option<f64>,
    angle_alpha: Option<f64>,
    angle_beta: Option<f64>,
    angle_gamma: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CitationFields {
    title: Option<String>,
    rcsb_authors: Option<Vec<String>>,
    journal_abbrev: Option<String>,
    year: Option<i32>,
    #[serde(rename = "pdbx_database_id_DOI")]
    pdbx_database_id_doi: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PolymerEntity {
    entity_poly: Option<EntityPoly>,
    rcsb_entity_source_organism: Option<Vec<SourceOrganism>>,
}

#[derive(Debug, Deserialize)]
struct EntityPoly {
    #[serde(rename = "type")]
    type_name: Option<String>,
    pdbx_strand_id: Option<String>,
    pdbx_seq_one_letter_code_can: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SourceOrganism {
    scientific_name: Option<String>,
}
