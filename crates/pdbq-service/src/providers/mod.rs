//! Data providers
//!
//! Three upstream sources implement one capability-tagged interface:
//! RCSB (primary structural DB), PDBe (mirror), and UniProt (sequence
//! DB). Not every provider supports every operation; unsupported calls
//! resolve to an explicit `Unsupported` error instead of panicking, and
//! the orchestrator inspects [`Provider::capabilities`] before spending
//! a call that is guaranteed to fail.

use async_trait::async_trait;
use pdbq_common::types::{
    AnalysisCategory, AnalysisReport, LigandOccurrences, LigandQuery, SearchQuery, SearchResult,
    SimilarityMode, StructureId, StructureRecord,
};
use pdbq_common::{PdbqError, Result};

mod pdbe;
mod rcsb;
mod uniprot;

pub use pdbe::PdbeProvider;
pub use rcsb::RcsbProvider;
pub use uniprot::UniprotProvider;

/// Selectable primary provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Rcsb,
    Uniprot,
}

impl std::str::FromStr for ProviderKind {
    type Err = PdbqError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rcsb" => Ok(ProviderKind::Rcsb),
            "uniprot" => Ok(ProviderKind::Uniprot),
            other => Err(PdbqError::Validation(format!(
                "unknown provider: {other}"
            ))),
        }
    }
}

/// Operations a provider can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Search,
    GetStructure,
    TrackLigands,
    FindSimilar,
    Analyze,
}

/// One candidate from a provider-side similarity search, before the
/// merger enriches and ranks it.
#[derive(Debug, Clone)]
pub struct SimilarityCandidate {
    pub id: StructureId,
    /// Relevance score from a sequence search, normalized to [0,1].
    pub sequence_identity: Option<f64>,
    pub e_value: Option<f64>,
    /// Raw shape-similarity score from a structure search. A different
    /// metric from the TM-score; reported as-is, never renormalized.
    pub shape_similarity: Option<f64>,
}

/// Uniform interface over the upstream structural/sequence databases.
///
/// Default method bodies return `Unsupported`, so a provider implements
/// only what it advertises in `capabilities()`.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> &'static [Capability];

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Lightweight liveness probe.
    async fn ping(&self) -> Result<()>;

    async fn search(&self, _query: &SearchQuery) -> Result<SearchResult> {
        Err(self.unsupported("search"))
    }

    async fn get_structure(&self, _id: &StructureId) -> Result<StructureRecord> {
        Err(self.unsupported("get_structure"))
    }

    async fn track_ligands(&self, _query: &LigandQuery, _limit: u32) -> Result<LigandOccurrences> {
        Err(self.unsupported("track_ligands"))
    }

    /// Candidate list for a similarity search against `reference`.
    async fn similar_candidates(
        &self,
        _reference: &StructureId,
        _mode: SimilarityMode,
        _limit: u32,
    ) -> Result<Vec<SimilarityCandidate>> {
        Err(self.unsupported("similar_candidates"))
    }

    async fn analyze(
        &self,
        _query: &SearchQuery,
        _category: AnalysisCategory,
    ) -> Result<AnalysisReport> {
        Err(self.unsupported("analyze"))
    }

    fn unsupported(&self, operation: &'static str) -> PdbqError {
        PdbqError::Unsupported {
            provider: self.name(),
            operation,
        }
    }
}
