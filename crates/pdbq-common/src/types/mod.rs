//! Common types used across PDBQ

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PdbqError, Result};

/// Maximum page size accepted by [`SearchQuery`].
pub const MAX_SEARCH_LIMIT: u32 = 100;

// ============================================================================
// Structure Identifiers
// ============================================================================

/// A validated, canonicalized PDB entry identifier.
///
/// Exactly 4 ASCII alphanumeric characters, stored upper-case.
/// Canonicalization is idempotent: parsing an already-canonical id
/// yields the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructureId(String);

impl StructureId {
    /// Validate and canonicalize a raw identifier.
    ///
    /// Rejects anything that is not exactly 4 alphanumeric characters
    /// before any network call is made.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.len() != 4 || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PdbqError::Validation(format!(
                "invalid structure identifier '{raw}': expected 4 alphanumeric characters"
            )));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StructureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Chains
// ============================================================================

/// Macromolecule type of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    Protein,
    Dna,
    Rna,
    Ligand,
    Water,
}

impl std::fmt::Display for ChainKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChainKind::Protein => "protein",
            ChainKind::Dna => "dna",
            ChainKind::Rna => "rna",
            ChainKind::Ligand => "ligand",
            ChainKind::Water => "water",
        };
        write!(f, "{s}")
    }
}

/// One polymer or non-polymer entity copy within a structure.
///
/// The id is the provider-native asym/strand id and is unique only
/// within its parent [`StructureRecord`]. Chains are built fresh per
/// request and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub id: String,
    pub kind: ChainKind,
    pub sequence: Option<String>,
    /// Residue count; equals `sequence.len()` whenever a sequence is present.
    pub length: usize,
    pub organism: Option<String>,
}

/// Merge a file-derived and a metadata-derived view of the same chain.
///
/// Precedence is fixed: the metadata source wins for organism, the file
/// source wins for sequence (and therefore length). A field absent from
/// one source falls back to the other source's value, never to a
/// placeholder. Either input may be missing entirely.
pub fn merge_chain(file: Option<&Chain>, meta: Option<&Chain>) -> Option<Chain> {
    match (file, meta) {
        (None, None) => None,
        (Some(f), None) => Some(f.clone()),
        (None, Some(m)) => Some(m.clone()),
        (Some(f), Some(m)) => {
            let sequence = f.sequence.clone().or_else(|| m.sequence.clone());
            let length = match &sequence {
                Some(s) => s.len(),
                None => {
                    if f.length > 0 {
                        f.length
                    } else {
                        m.length
                    }
                },
            };
            Some(Chain {
                id: f.id.clone(),
                kind: f.kind,
                sequence,
                length,
                organism: m.organism.clone().or_else(|| f.organism.clone()),
            })
        },
    }
}

// ============================================================================
// Structure Records
// ============================================================================

/// A literature citation attached to a structure entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub journal: Option<String>,
    pub year: Option<i32>,
    pub doi: Option<String>,
}

/// Full structural record for one PDB entry.
///
/// A record with zero chains is valid; it means the coordinate file was
/// unavailable or unparsable and only API metadata is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureRecord {
    pub id: StructureId,
    pub title: Option<String>,
    pub method: Option<String>,
    /// Resolution in Ångströms, when the method reports one.
    pub resolution: Option<f64>,
    pub r_factor: Option<f64>,
    pub r_free: Option<f64>,
    pub space_group: Option<String>,
    /// a, b, c, alpha, beta, gamma.
    pub unit_cell: Option<[f64; 6]>,
    pub chains: Vec<Chain>,
    pub citations: Vec<Citation>,
}

// ============================================================================
// Search
// ============================================================================

/// Generic structure search request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text term; optional on pure filter queries.
    pub text: Option<String>,
    pub organism: Option<String>,
    pub method: Option<String>,
    pub min_resolution: Option<f64>,
    pub max_resolution: Option<f64>,
    pub limit: u32,
    pub offset: u32,
}

impl SearchQuery {
    /// Validate bounds before any provider dispatch.
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 || self.limit > MAX_SEARCH_LIMIT {
            return Err(PdbqError::Validation(format!(
                "limit must be between 1 and {MAX_SEARCH_LIMIT}, got {}",
                self.limit
            )));
        }
        if let (Some(min), Some(max)) = (self.min_resolution, self.max_resolution) {
            if min > max {
                return Err(PdbqError::Validation(format!(
                    "min_resolution ({min}) must not exceed max_resolution ({max})"
                )));
            }
        }
        Ok(())
    }
}

/// Lightweight search result entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: StructureId,
    pub title: Option<String>,
    pub organisms: Vec<String>,
    pub method: Option<String>,
    pub resolution: Option<f64>,
    pub release_date: Option<NaiveDate>,
}

/// One page of search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub hits: Vec<SearchHit>,
    /// Total matches upstream; may exceed the returned page size.
    pub total_count: u64,
    pub has_more: bool,
}

impl SearchResult {
    /// Build a page, deriving `has_more` from total vs. offset + page size.
    pub fn page(hits: Vec<SearchHit>, total_count: u64, offset: u32) -> Self {
        let has_more = total_count > offset as u64 + hits.len() as u64;
        Self {
            hits,
            total_count,
            has_more,
        }
    }
}

// ============================================================================
// Ligand Queries
// ============================================================================

/// Chemical descriptor notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorKind {
    Smiles,
    InChI,
}

/// Match strictness for descriptor-based ligand searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorMatchMode {
    GraphExact,
    GraphRelaxed,
    GraphRelaxedStereo,
    FingerprintSimilarity,
}

/// Discriminated ligand lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum LigandQuery {
    /// Exact chemical component id, e.g. "ATP".
    ChemicalId { id: String },
    /// Free-text chemical name.
    Name { name: String },
    /// SMILES/InChI descriptor with a match strictness.
    Descriptor {
        descriptor: String,
        kind: DescriptorKind,
        match_mode: DescriptorMatchMode,
    },
}

/// Structures containing a queried ligand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LigandOccurrences {
    pub ligand: String,
    pub structures: Vec<SearchHit>,
    pub total_count: u64,
}

// ============================================================================
// Alignment & Similarity
// ============================================================================

/// Score bundle reported by a completed pairwise alignment.
///
/// A missing score stays `None`; zero is a meaningful RMSD value and is
/// never used as a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentScores {
    pub rmsd: Option<f64>,
    pub tm_score: Option<f64>,
    pub sequence_identity: Option<f64>,
    pub aligned_residues: Option<u32>,
    pub query_length: Option<u32>,
}

/// Which similarity signal to rank by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMode {
    Sequence,
    Structure,
}

/// One ranked candidate from a similarity search.
///
/// Sequence mode fills `sequence_identity`/`e_value`; structure mode
/// fills `tm_score`/`rmsd`/`shape_similarity`. The shape-similarity score
/// comes from the provider's shape search and is a different metric from
/// the TM-score; both are kept, neither is renormalized into the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityHit {
    pub id: StructureId,
    pub title: Option<String>,
    pub organisms: Vec<String>,
    pub sequence_identity: Option<f64>,
    pub e_value: Option<f64>,
    pub tm_score: Option<f64>,
    pub rmsd: Option<f64>,
    pub shape_similarity: Option<f64>,
    /// `aligned_residues / query_length * 100`, when both are known.
    pub coverage: Option<f64>,
}

// ============================================================================
// Collection Analysis
// ============================================================================

/// Aggregation dimension for collection analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisCategory {
    Fold,
    Function,
    Organism,
    Method,
}

/// One facet bucket: a distinct attribute value and its entry count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetBucket {
    pub value: String,
    pub count: u64,
}

/// Facet breakdown for a collection of structures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub category: AnalysisCategory,
    pub total_count: u64,
    pub buckets: Vec<FacetBucket>,
}

// ============================================================================
// Health
// ============================================================================

/// Liveness of the configured providers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HealthReport {
    pub primary: bool,
    pub fallback: bool,
    /// True when either provider answered its probe.
    pub healthy: bool,
}
