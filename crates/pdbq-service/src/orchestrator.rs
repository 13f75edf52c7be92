//! Multi-provider orchestration
//!
//! Routes each logical operation to the primary provider and falls back
//! to the mirror when the primary fails and the mirror advertises the
//! capability. `NotFound` never triggers a fallback, since the mirror serves
//! the same dataset, so a missing entry stays missing. Validation
//! happens before any provider call. The orchestrator holds no mutable
//! state; every call stands alone.

use pdbq_common::types::{
    AlignmentScores, AnalysisCategory, AnalysisReport, HealthReport, LigandOccurrences,
    LigandQuery, SearchQuery, SearchResult, SimilarityHit, SimilarityMode, StructureId,
    StructureRecord, MAX_SEARCH_LIMIT,
};
use pdbq_common::{PdbqError, Result};
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

use crate::alignment::{AlignmentAlgorithm, AlignmentClient, AlignmentTarget};
use crate::config::Config;
use crate::metadata::EnrichmentClient;
use crate::providers::{
    Capability, PdbeProvider, Provider, ProviderKind, RcsbProvider, UniprotProvider,
};
use crate::similarity::SimilarityMerger;

pub struct Orchestrator {
    primary: Arc<dyn Provider>,
    fallback: Arc<dyn Provider>,
    alignment: AlignmentClient,
    merger: SimilarityMerger,
}

impl Orchestrator {
    pub fn new(
        primary: Arc<dyn Provider>,
        fallback: Arc<dyn Provider>,
        alignment: AlignmentClient,
        merger: SimilarityMerger,
    ) -> Self {
        Self {
            primary,
            fallback,
            alignment,
            merger,
        }
    }

    /// Wire up the default RCSB-primary / PDBe-fallback stack.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::from_config_with_primary(config, ProviderKind::Rcsb)
    }

    /// Wire up the stack with a caller-chosen primary provider.
    ///
    /// The PDBe mirror stays in the fallback slot either way; capability
    /// gating routes operations the primary does not carry.
    pub fn from_config_with_primary(
        config: &Config,
        primary: ProviderKind,
    ) -> anyhow::Result<Self> {
        let client = config.build_http_client()?;

        let primary: Arc<dyn Provider> = match primary {
            ProviderKind::Rcsb => Arc::new(RcsbProvider::new(client.clone(), &config.rcsb)),
            ProviderKind::Uniprot => {
                Arc::new(UniprotProvider::new(client.clone(), &config.uniprot))
            },
        };
        let fallback = Arc::new(PdbeProvider::new(client.clone(), &config.pdbe));
        let alignment = AlignmentClient::new(client.clone(), &config.alignment);
        let enrichment = EnrichmentClient::new(client, config.rcsb.graphql_url.clone());
        let merger = SimilarityMerger::new(alignment.clone(), enrichment);

        Ok(Self::new(primary, fallback, alignment, merger))
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        query.validate()?;
        self.with_fallback(Capability::Search, "search", |p| async move {
            p.search(query).await
        })
        .await
    }

    pub async fn get_structure(&self, raw_id: &str) -> Result<StructureRecord> {
        let id = StructureId::parse(raw_id)?;
        self.with_fallback(Capability::GetStructure, "get_structure", |p| {
            let id = id.clone();
            async move { p.get_structure(&id).await }
        })
        .await
    }

    /// Pairwise comparison goes straight to the alignment service; no
    /// provider carries this capability, so there is no fallback leg.
    pub async fn compare_structures(
        &self,
        raw_a: &str,
        chain_a: Option<&str>,
        raw_b: &str,
        chain_b: Option<&str>,
        algorithm: AlignmentAlgorithm,
    ) -> Result<AlignmentScores> {
        let a = AlignmentTarget {
            id: StructureId::parse(raw_a)?,
            chain: chain_a.map(String::from),
        };
        let b = AlignmentTarget {
            id: StructureId::parse(raw_b)?,
            chain: chain_b.map(String::from),
        };
        self.alignment.align(&a, &b, algorithm).await
    }

    pub async fn find_similar(
        &self,
        raw_id: &str,
        chain: Option<&str>,
        mode: SimilarityMode,
        limit: u32,
    ) -> Result<Vec<SimilarityHit>> {
        let id = StructureId::parse(raw_id)?;
        validate_limit(limit)?;

        // Mirror has no similarity surface; primary errors surface as-is.
        let candidates = self.primary.similar_candidates(&id, mode, limit).await?;
        self.merger
            .rank(&id, chain, mode, candidates, limit, AlignmentAlgorithm::default())
            .await
    }

    pub async fn track_ligands(
        &self,
        query: &LigandQuery,
        limit: u32,
    ) -> Result<LigandOccurrences> {
        validate_limit(limit)?;
        self.with_fallback(Capability::TrackLigands, "track_ligands", |p| async move {
            p.track_ligands(query, limit).await
        })
        .await
    }

    pub async fn analyze_collection(
        &self,
        query: &SearchQuery,
        category: AnalysisCategory,
    ) -> Result<AnalysisReport> {
        query.validate()?;
        self.with_fallback(Capability::Analyze, "analyze_collection", |p| async move {
            p.analyze(query, category).await
        })
        .await
    }

    /// Probe both providers in parallel; healthy when either answers.
    pub async fn health_check(&self) -> HealthReport {
        let (primary, fallback) = tokio::join!(self.primary.ping(), self.fallback.ping());
        let primary = primary.is_ok();
        let fallback = fallback.is_ok();
        HealthReport {
            primary,
            fallback,
            healthy: primary || fallback,
        }
    }

    /// Primary-then-fallback routing.
    ///
    /// The fallback leg only runs when the mirror advertises the
    /// capability; otherwise the primary's error surfaces verbatim, with
    /// its classification intact. A double failure collapses into one
    /// `ServiceUnavailable` carrying the fallback's message.
    async fn with_fallback<T, F, Fut>(
        &self,
        capability: Capability,
        operation: &'static str,
        call: F,
    ) -> Result<T>
    where
        F: Fn(Arc<dyn Provider>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let primary_err = match call(self.primary.clone()).await {
            Ok(value) => return Ok(value),
            Err(e @ (PdbqError::NotFound(_) | PdbqError::Validation(_))) => return Err(e),
            Err(e) => e,
        };

        if !self.fallback.supports(capability) {
            return Err(primary_err);
        }

        warn!(
            provider = self.primary.name(),
            operation,
            error = %primary_err,
            "primary provider failed, trying fallback"
        );

        match call(self.fallback.clone()).await {
            Ok(value) => Ok(value),
            Err(fallback_err) => Err(PdbqError::ServiceUnavailable(format!(
                "all providers failed for {operation}: {fallback_err}"
            ))),
        }
    }
}

fn validate_limit(limit: u32) -> Result<()> {
    if limit == 0 || limit > MAX_SEARCH_LIMIT {
        return Err(PdbqError::Validation(format!(
            "limit must be between 1 and {MAX_SEARCH_LIMIT}, got {limit}"
        )));
    }
    Ok(())
}
