//! PDBe provider (mirror structural DB)
//!
//! REST-only mirror of the same dataset: entry summary/molecules/
//! experiment endpoints for structure fetches, the Solr endpoint for
//! free-text search, and the compound index for ligand occurrence.
//! No alignment, similarity, or facet surface; those stay primary-only.

use async_trait::async_trait;
use pdbq_common::types::{
    Chain, LigandOccurrences, LigandQuery, SearchHit, SearchQuery, SearchResult, StructureId,
    StructureRecord,
};
use pdbq_common::{PdbqError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

use crate::config::PdbeConfig;
use crate::mmcif;
use crate::providers::{Capability, Provider};

/// Known-good entry probed by the liveness check.
const PROBE_ENTRY: &str = "1cbs";

pub struct PdbeProvider {
    client: reqwest::Client,
    api_url: String,
    search_url: String,
}

impl PdbeProvider {
    pub fn new(client: reqwest::Client, config: &PdbeConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            search_url: config.search_url.clone(),
        }
    }

    /// GET one of the keyed-by-entry-id REST endpoints.
    ///
    /// PDBe wraps every payload in `{"<id>": [...]}` with a lower-case
    /// key; a 404 means the entry does not exist.
    async fn entry_endpoint<T: serde::de::DeserializeOwned>(
        &self,
        section: &str,
        id: &StructureId,
    ) -> Result<Vec<T>> {
        let key = id.as_str().to_ascii_lowercase();
        let url = format!("{}/pdb/entry/{}/{}", self.api_url, section, key);
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PdbqError::NotFound(format!("structure {id} does not exist")));
        }
        if !response.status().is_success() {
            return Err(PdbqError::ServiceUnavailable(format!(
                "PDBe {section} endpoint returned {}",
                response.status()
            )));
        }

        let mut keyed: HashMap<String, Vec<T>> = response.json().await?;
        Ok(keyed.remove(&key).unwrap_or_default())
    }

    async fn solr_search(&self, q: &str, rows: u32, start: u32) -> Result<SolrResponse> {
        let response = self
            .client
            .get(&self.search_url)
            .query(&[
                ("q", q),
                ("wt", "json"),
                ("rows", &rows.to_string()),
                ("start", &start.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PdbqError::ServiceUnavailable(format!(
                "PDBe search endpoint returned {}",
                response.status()
            )));
        }

        let wrapper: SolrWrapper = response.json().await?;
        Ok(wrapper.response)
    }
}

#[async_trait]
impl Provider for PdbeProvider {
    fn name(&self) -> &'static str {
        "pdbe"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[
            Capability::Search,
            Capability::GetStructure,
            Capability::TrackLigands,
        ]
    }

    async fn ping(&self) -> Result<()> {
        let id = StructureId::parse(PROBE_ENTRY)?;
        self.entry_endpoint::<serde_json::Value>("summary", &id)
            .await
            .map(|_| ())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        let q = solr_query(query);
        let solr = self.solr_search(&q, query.limit, query.offset).await?;

        // Solr answers per-entity documents; collapse to one hit per entry.
        let mut hits: Vec<SearchHit> = Vec::new();
        for doc in solr.docs {
            let Some(raw_id) = doc.pdb_id.as_deref() else { continue };
            let Ok(id) = StructureId::parse(raw_id) else { continue };
            if hits.iter().any(|h| h.id == id) {
                continue;
            }
            hits.push(SearchHit {
                id,
                title: doc.title,
                organisms: doc.organism_scientific_name.unwrap_or_default(),
                method: doc
                    .experimental_method
                    .and_then(|m| m.into_iter().next()),
                resolution: doc.resolution,
                release_date: doc
                    .release_date
                    .and_then(|d| d.get(..10).and_then(|p| p.parse().ok())),
            });
        }

        Ok(SearchResult::page(hits, solr.num_found, query.offset))
    }

    async fn get_structure(&self, id: &StructureId) -> Result<StructureRecord> {
        let summary: Vec<SummaryDoc> = self.entry_endpoint("summary", id).await?;
        let Some(summary) = summary.into_iter().next() else {
            return Err(PdbqError::NotFound(format!("structure {id} does not exist")));
        };

        // Molecules and experiment are best-effort; the summary alone is
        // a valid (chain-less) record.
        let (molecules, experiment) = tokio::join!(
            self.entry_endpoint::<MoleculeDoc>("molecules", id),
            self.entry_endpoint::<ExperimentDoc>("experiment", id),
        );

        let chains = match molecules {
            Ok(molecules) => molecule_chains(molecules),
            Err(e) => {
                warn!(id = %id, error = %e, "PDBe molecules unavailable");
                Vec::new()
            },
        };

        let experiment = match experiment {
            Ok(docs) => docs.into_iter().next(),
            Err(e) => {
                warn!(id = %id, error = %e, "PDBe experiment unavailable");
                None
            },
        };

        let unit_cell = experiment.as_ref().and_then(|e| e.cell.as_ref()).and_then(|c| {
            Some([c.a?, c.b?, c.c?, c.alpha?, c.beta?, c.gamma?])
        });

        Ok(StructureRecord {
            id: id.clone(),
            title: summary.title,
            method: summary
                .experimental_method
                .and_then(|m| m.into_iter().next()),
            resolution: experiment.as_ref().and_then(|e| e.resolution),
            r_factor: experiment.as_ref().and_then(|e| e.r_factor),
            r_free: experiment.as_ref().and_then(|e| e.r_free),
            space_group: experiment.and_then(|e| e.spacegroup),
            unit_cell,
            chains,
            citations: Vec::new(),
        })
    }

    async fn track_ligands(&self, query: &LigandQuery, limit: u32) -> Result<LigandOccurrences> {
        match query {
            LigandQuery::ChemicalId { id } => {
                let comp = id.trim().to_ascii_uppercase();
                if comp.is_empty() {
                    return Err(PdbqError::Validation("chemical id must not be empty".into()));
                }
                let url = format!("{}/pdb/compound/in_pdb/{}", self.api_url, comp);
                let response = self.client.get(&url).send().await?;
                if response.status() == reqwest::StatusCode::NOT_FOUND {
                    return Err(PdbqError::NotFound(format!("chemical component {comp}")));
                }
                if !response.status().is_success() {
                    return Err(PdbqError::ServiceUnavailable(format!(
                        "PDBe compound endpoint returned {}",
                        response.status()
                    )));
                }

                let mut keyed: HashMap<String, Vec<String>> = response.json().await?;
                let entries = keyed.remove(&comp).unwrap_or_default();
                let total_count = entries.len() as u64;

                let structures = entries
                    .into_iter()
                    .filter_map(|raw| StructureId::parse(&raw).ok())
                    .take(limit as usize)
                    .map(|id| SearchHit {
                        id,
                        title: None,
                        organisms: Vec::new(),
                        method: None,
                        resolution: None,
                        release_date: None,
                    })
                    .collect();

                Ok(LigandOccurrences {
                    ligand: comp,
                    structures,
                    total_count,
                })
            },
            LigandQuery::Name { name } => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(PdbqError::Validation(
                        "chemical name must not be empty".into(),
                    ));
                }
                let q = format!("compound_name:\"{name}\"");
                let solr = self.solr_search(&q, limit, 0).await?;
                let structures = solr
                    .docs
                    .into_iter()
                    .filter_map(|d| {
                        let id = StructureId::parse(d.pdb_id.as_deref()?).ok()?;
                        Some(SearchHit {
                            id,
                            title: d.title,
                            organisms: d.organism_scientific_name.unwrap_or_default(),
                            method: None,
                            resolution: d.resolution,
                            release_date: None,
                        })
                    })
                    .collect();
                Ok(LigandOccurrences {
                    ligand: name.to_string(),
                    structures,
                    total_count: solr.num_found,
                })
            },
            // No descriptor search surface on the mirror.
            LigandQuery::Descriptor { .. } => Err(PdbqError::Unsupported {
                provider: "pdbe",
                operation: "track_ligands by chemical descriptor",
            }),
        }
    }
}

/// Compose a Solr query string from the generic search filters.
fn solr_query(query: &SearchQuery) -> String {
    let mut clauses = Vec::new();

    if let Some(text) = query.text.as_deref().filter(|t| !t.trim().is_empty()) {
        clauses.push(format!("({text})"));
    }
    if let Some(organism) = query.organism.as_deref() {
        clauses.push(format!("organism_scientific_name:\"{organism}\""));
    }
    if let Some(method) = query.method.as_deref() {
        clauses.push(format!("experimental_method:\"{method}\""));
    }
    if let Some(max) = query.max_resolution {
        clauses.push(format!("resolution:[0 TO {max}]"));
    }

    if clauses.is_empty() {
        "*:*".to_string()
    } else {
        clauses.join(" AND ")
    }
}

/// Expand one molecules document into per-chain entries.
fn molecule_chains(molecules: Vec<MoleculeDoc>) -> Vec<Chain> {
    let mut chains = Vec::new();
    for molecule in molecules {
        let Some(kind) = molecule.molecule_type.as_deref().map(mmcif::entity_kind) else {
            continue;
        };
        let sequence = molecule.sequence.filter(|s| !s.is_empty());
        let length = sequence.as_deref().map(str::len).unwrap_or(0);
        let organism = molecule
            .source
            .unwrap_or_default()
            .into_iter()
            .find_map(|s| s.organism_scientific_name);

        for id in molecule.in_chains.unwrap_or_default() {
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

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SolrWrapper {
    response: SolrResponse,
}

#[derive(Debug, Deserialize)]
struct SolrResponse {
    #[serde(rename = "numFound", default)]
    num_found: u64,
    #[serde(default)]
    docs: Vec<SolrDoc>,
}

#[derive(Debug, Deserialize)]
struct SolrDoc {
    pdb_id: Option<String>,
    title: Option<String>,
    organism_scientific_name: Option<Vec<String>>,
    experimental_method: Option<Vec<String>>,
    resolution: Option<f64>,
    release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryDoc {
    title: Option<String>,
    experimental_method: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct MoleculeDoc {
    molecule_type: Option<String>,
    in_chains: Option<Vec<String>>,
    sequence: Option<String>,
    source: Option<Vec<SourceDoc>>,
}

#[derive(Debug, Deserialize)]
struct SourceDoc {
    organism_scientific_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExperimentDoc {
    resolution: Option<f64>,
    r_factor: Option<f64>,
    r_free: Option<f64>,
    spacegroup: Option<String>,
    cell: Option<CellDoc>,
}

#[derive(Debug, Deserialize)]
struct CellDoc {
    a: Option<f64>,
    b: Option<f64>,
    c: Option<f64>,
    alpha: Option<f64>,
    beta: Option<f64>,
    gamma: Option<f64>,
}
