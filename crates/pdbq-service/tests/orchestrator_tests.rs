//! Orchestrator routing and fallback tests
//!
//! Providers are replaced with in-process stubs so the routing policy is
//! tested in isolation: fallback on retryable primary failures, direct
//! surfacing of NotFound, zero provider calls on validation errors, and
//! OR'd health aggregation.

use async_trait::async_trait;
use pdbq_common::types::{
    HealthReport, SearchHit, SearchQuery, SearchResult, SimilarityMode, StructureId,
    StructureRecord,
};
use pdbq_common::{PdbqError, Result};
use pdbq_service::alignment::AlignmentClient;
use pdbq_service::config::AlignmentConfig;
use pdbq_service::metadata::EnrichmentClient;
use pdbq_service::orchestrator::Orchestrator;
use pdbq_service::providers::{Capability, Provider, SimilarityCandidate};
use pdbq_service::similarity::SimilarityMerger;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// How a stub answers any supported operation.
#[derive(Clone, Copy, PartialEq)]
enum Behavior {
    Succeed,
    FailUnavailable,
    FailNotFound,
    FailPing,
}

struct StubProvider {
    name: &'static str,
    caps: &'static [Capability],
    behavior: Behavior,
    calls: AtomicUsize,
}

impl StubProvider {
    fn new(name: &'static str, caps: &'static [Capability], behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name,
            caps,
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer<T>(&self, value: T) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Succeed => Ok(value),
            Behavior::FailUnavailable | Behavior::FailPing => Err(PdbqError::ServiceUnavailable(
                format!("{} is down", self.name),
            )),
            Behavior::FailNotFound => Err(PdbqError::NotFound("no such structure".to_string())),
        }
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn capabilities(&self) -> &'static [Capability] {
        self.caps
    }

    async fn ping(&self) -> Result<()> {
        match self.behavior {
            Behavior::FailPing | Behavior::FailUnavailable => {
                Err(PdbqError::ServiceUnavailable("probe failed".to_string()))
            },
            _ => Ok(()),
        }
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        let hits = vec![sample_hit("1AAA"), sample_hit("2BBB"), sample_hit("3CCC")];
        self.answer(SearchResult::page(hits, 3, query.offset))
    }

    async fn get_structure(&self, id: &StructureId) -> Result<StructureRecord> {
        self.answer(StructureRecord {
            id: id.clone(),
            title: Some(format!("from {}", self.name)),
            method: Some("X-RAY DIFFRACTION".to_string()),
            resolution: Some(2.0),
            r_factor: None,
            r_free: None,
            space_group: None,
            unit_cell: None,
            chains: Vec::new(),
            citations: Vec::new(),
        })
    }

    async fn similar_candidates(
        &self,
        _reference: &StructureId,
        _mode: SimilarityMode,
        _limit: u32,
    ) -> Result<Vec<SimilarityCandidate>> {
        self.answer(Vec::new())
    }
}

fn sample_hit(id: &str) -> SearchHit {
    SearchHit {
        id: StructureId::parse(id).unwrap(),
        title: None,
        organisms: Vec::new(),
        method: None,
        resolution: None,
        release_date: None,
    }
}

const FULL_CAPS: &[Capability] = &[
    Capability::Search,
    Capability::GetStructure,
    Capability::TrackLigands,
    Capability::FindSimilar,
    Capability::Analyze,
];

const MIRROR_CAPS: &[Capability] = &[
    Capability::Search,
    Capability::GetStructure,
    Capability::TrackLigands,
];

fn orchestrator(primary: Arc<StubProvider>, fallback: Arc<StubProvider>) -> Orchestrator {
    // Offline alignment/enrichment endpoints; these tests never reach them.
    let client = reqwest::Client::new();
    let alignment_config = AlignmentConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        poll_interval_secs: 1,
        max_poll_attempts: 1,
    };
    let alignment = AlignmentClient::new(client.clone(), &alignment_config);
    let enrichment = EnrichmentClient::new(client, "http://127.0.0.1:9".to_string());
    let merger = SimilarityMerger::new(alignment.clone(), enrichment);
    Orchestrator::new(primary, fallback, alignment, merger)
}

fn search_query() -> SearchQuery {
    SearchQuery {
        text: Some("hemoglobin".to_string()),
        max_resolution: Some(2.0),
        limit: 10,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_fallback_serves_when_primary_fails() {
    let primary = StubProvider::new("primary", FULL_CAPS, Behavior::FailUnavailable);
    let fallback = StubProvider::new("fallback", MIRROR_CAPS, Behavior::Succeed);
    let orch = orchestrator(primary.clone(), fallback.clone());

    let result = orch.search(&search_query()).await.unwrap();

    assert_eq!(result.hits.len(), 3);
    assert_eq!(result.total_count, 3);
    assert!(!result.has_more);
    assert_eq!(primary.calls(), 1);
    assert_eq!(fallback.calls(), 1);
}

#[tokio::test]
async fn test_double_failure_carries_fallback_message() {
    let primary = StubProvider::new("primary", FULL_CAPS, Behavior::FailUnavailable);
    let fallback = StubProvider::new("fallback", MIRROR_CAPS, Behavior::FailUnavailable);
    let orch = orchestrator(primary, fallback);

    let err = orch.search(&search_query()).await.unwrap_err();

    match err {
        PdbqError::ServiceUnavailable(message) => {
            assert!(message.contains("fallback is down"), "got: {message}");
        },
        other => panic!("expected ServiceUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_not_found_skips_fallback() {
    let primary = StubProvider::new("primary", FULL_CAPS, Behavior::FailNotFound);
    let fallback = StubProvider::new("fallback", MIRROR_CAPS, Behavior::Succeed);
    let orch = orchestrator(primary.clone(), fallback.clone());

    let err = orch.get_structure("1ABC").await.unwrap_err();

    // The mirror serves the same dataset; a missing id stays missing.
    assert!(matches!(err, PdbqError::NotFound(_)));
    assert_eq!(primary.calls(), 1);
    assert_eq!(fallback.calls(), 0);
}

#[tokio::test]
async fn test_validation_error_before_any_provider_call() {
    let primary = StubProvider::new("primary", FULL_CAPS, Behavior::Succeed);
    let fallback = StubProvider::new("fallback", MIRROR_CAPS, Behavior::Succeed);
    let orch = orchestrator(primary.clone(), fallback.clone());

    let query = SearchQuery {
        min_resolution: Some(3.0),
        max_resolution: Some(1.0),
        limit: 10,
        ..Default::default()
    };
    let err = orch.search(&query).await.unwrap_err();
    assert!(matches!(err, PdbqError::Validation(_)));

    let err = orch.get_structure("not-an-id").await.unwrap_err();
    assert!(matches!(err, PdbqError::Validation(_)));

    assert_eq!(primary.calls(), 0);
    assert_eq!(fallback.calls(), 0);
}

#[tokio::test]
async fn test_unsupported_fallback_surfaces_primary_error() {
    let primary = StubProvider::new("primary", FULL_CAPS, Behavior::FailUnavailable);
    let fallback = StubProvider::new("fallback", MIRROR_CAPS, Behavior::Succeed);
    let orch = orchestrator(primary.clone(), fallback.clone());

    // The mirror advertises no similarity capability, so the primary's
    // error must come through verbatim, not wrapped.
    let err = orch
        .find_similar("1ABC", None, SimilarityMode::Structure, 5)
        .await
        .unwrap_err();

    match err {
        PdbqError::ServiceUnavailable(message) => {
            assert!(message.contains("primary is down"), "got: {message}");
        },
        other => panic!("expected ServiceUnavailable, got {other:?}"),
    }
    assert_eq!(fallback.calls(), 0);
}

#[tokio::test]
async fn test_health_is_or_of_probes() {
    let up = StubProvider::new("primary", FULL_CAPS, Behavior::Succeed);
    let down = StubProvider::new("fallback", MIRROR_CAPS, Behavior::FailPing);

    let orch = orchestrator(up, down);
    let HealthReport {
        primary,
        fallback,
        healthy,
    } = orch.health_check().await;
    assert!(primary);
    assert!(!fallback);
    assert!(healthy);

    let orch = orchestrator(
        StubProvider::new("primary", FULL_CAPS, Behavior::FailPing),
        StubProvider::new("fallback", MIRROR_CAPS, Behavior::FailPing),
    );
    assert!(!orch.health_check().await.healthy);
}
