//! UniProt provider (sequence DB)
//!
//! Protein-centric source: a UniProtKB free-text search is mapped onto
//! structure hits through the entries' PDB cross-references. Selectable
//! as an alternative search provider; it owns no structural data, so
//! everything beyond search is unsupported.

use async_trait::async_trait;
use pdbq_common::types::{SearchHit, SearchQuery, SearchResult, StructureId};
use pdbq_common::{PdbqError, Result};
use serde::Deserialize;

use crate::config::UniprotConfig;
use crate::providers::{Capability, Provider};

pub struct UniprotProvider {
    client: reqwest::Client,
    search_url: String,
}

impl UniprotProvider {
    pub fn new(client: reqwest::Client, config: &UniprotConfig) -> Self {
        Self {
            client,
            search_url: config.search_url.clone(),
        }
    }

    async fn query_uniprot(&self, query: &str, size: u32) -> Result<(Vec<UniprotEntry>, u64)> {
        let response = self
            .client
            .get(&self.search_url)
            .query(&[
                ("query", query),
                ("format", "json"),
                ("size", &size.to_string()),
                ("fields", "accession,protein_name,organism_name,xref_pdb"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PdbqError::ServiceUnavailable(format!(
                "UniProt search endpoint returned {}",
                response.status()
            )));
        }

        let total = response
            .headers()
            .get("x-total-results")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());

        let payload: UniprotResponse = response.json().await?;
        let total = total.unwrap_or(payload.results.len() as u64);
        Ok((payload.results, total))
    }
}

#[async_trait]
impl Provider for UniprotProvider {
    fn name(&self) -> &'static str {
        "uniprot"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Search]
    }

    async fn ping(&self) -> Result<()> {
        self.query_uniprot("insulin", 1).await.map(|_| ())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        // Upstream paging is cursor-based; a numeric offset cannot be
        // translated, so only the first page is addressable.
        if query.offset != 0 {
            return Err(PdbqError::Validation(format!(
                "uniprot search supports only offset 0, got {}",
                query.offset
            )));
        }

        let mut clauses = Vec::new();
        if let Some(text) = query.text.as_deref().filter(|t| !t.trim().is_empty()) {
            clauses.push(text.to_string());
        }
        if let Some(organism) = query.organism.as_deref() {
            clauses.push(format!("organism_name:\"{organism}\""));
        }
        // Only entries with a solved structure can produce hits.
        clauses.push("database:pdb".to_string());
        let q = clauses.join(" AND ");

        let (entries, total) = self.query_uniprot(&q, query.limit).await?;

        let mut hits: Vec<SearchHit> = Vec::new();
        for entry in entries {
            let title = entry.protein_name();
            let organism = entry
                .organism
                .as_ref()
                .and_then(|o| o.scientific_name.clone());

            for xref in entry.cross_references.unwrap_or_default() {
                if xref.database.as_deref() != Some("PDB") {
                    continue;
                }
                let Some(raw) = xref.id.as_deref() else { continue };
                let Ok(id) = StructureId::parse(raw) else { continue };
                if hits.iter().any(|h| h.id == id) {
                    continue;
                }
                hits.push(SearchHit {
                    id,
                    title: title.clone(),
                    organisms: organism.iter().cloned().collect(),
                    method: None,
                    resolution: None,
                    release_date: None,
                });
                if hits.len() as u32 >= query.limit {
                    break;
                }
            }
            if hits.len() as u32 >= query.limit {
                break;
            }
        }

        Ok(SearchResult::page(hits, total, 0))
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct UniprotResponse {
    #[serde(default)]
    results: Vec<UniprotEntry>,
}

#[derive(Debug, Deserialize)]
struct UniprotEntry {
    #[serde(rename = "proteinDescription")]
    protein_description: Option<ProteinDescription>,
    organism: Option<Organism>,
    #[serde(rename = "uniProtKBCrossReferences")]
    cross_references: Option<Vec<CrossReference>>,
}

impl UniprotEntry {
    fn protein_name(&self) -> Option<String> {
        self.protein_description
            .as_ref()?
            .recommended_name
            .as_ref()?
            .full_name
            .as_ref()?
            .value
            .clone()
    }
}

#[derive(Debug, Deserialize)]
struct ProteinDescription {
    #[serde(rename = "recommendedName")]
    recommended_name: Option<RecommendedName>,
}

#[derive(Debug, Deserialize)]
struct RecommendedName {
    #[serde(rename = "fullName")]
    full_name: Option<FullName>,
}

#[derive(Debug, Deserialize)]
struct FullName {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Organism {
    #[serde(rename = "scientificName")]
    scientific_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossReference {
    database: Option<String>,
    id: Option<String>,
}
