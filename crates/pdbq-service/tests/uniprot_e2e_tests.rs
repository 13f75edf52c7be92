//! End-to-end tests for the UniProt provider
//!
//! UniProtKB answers protein entries, not structures; the provider maps
//! each entry's PDB cross-references onto search hits. These tests cover
//! that mapping (non-PDB xrefs skipped, duplicates collapsed, limit cut),
//! the first-page-only offset rule, and selecting UniProt as the primary
//! provider through the orchestrator wiring.

use pdbq_common::types::SearchQuery;
use pdbq_common::PdbqError;
use pdbq_service::config::{
    AlignmentConfig, Config, HttpConfig, PdbeConfig, RcsbConfig, UniprotConfig,
};
use pdbq_service::orchestrator::Orchestrator;
use pdbq_service::providers::{Provider, ProviderKind, UniprotProvider};
use wiremock::matchers::{method, path, query_param, query_param_contains};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> UniprotProvider {
    let config = UniprotConfig {
        search_url: format!("{}/uniprotkb/search", server.uri()),
    };
    UniprotProvider::new(reqwest::Client::new(), &config)
}

fn hemoglobin_entries() -> serde_json::Value {
    serde_json::json!({
        "results": [
            {
                "primaryAccession": "P69905",
                "proteinDescription": {
                    "recommendedName": {
                        "fullName": { "value": "Hemoglobin subunit alpha" }
                    }
                },
                "organism": { "scientificName": "Homo sapiens" },
                "uniProtKBCrossReferences": [
                    { "database": "PDB", "id": "4HHB" },
                    { "database": "EMBL", "id": "V00493" },
                    { "database": "PDB", "id": "1HHO" }
                ]
            },
            {
                "primaryAccession": "P68871",
                "proteinDescription": {
                    "recommendedName": {
                        "fullName": { "value": "Hemoglobin subunit beta" }
                    }
                },
                "organism": { "scientificName": "Homo sapiens" },
                "uniProtKBCrossReferences": [
                    { "database": "PDB", "id": "4HHB" },
                    { "database": "PDB", "id": "2DHB" }
                ]
            }
        ]
    })
}

#[tokio::test]
async fn test_search_maps_pdb_cross_references() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/uniprotkb/search"))
        .and(query_param_contains("query", "database:pdb"))
        .and(query_param("size", "10"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-total-results", "25")
                .set_body_json(hemoglobin_entries()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let query = SearchQuery {
        text: Some("hemoglobin".to_string()),
        limit: 10,
        ..Default::default()
    };
    let result = provider(&server).search(&query).await.unwrap();

    // EMBL xref skipped, 4HHB deduped across both entries.
    let ids: Vec<&str> = result.hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["4HHB", "1HHO", "2DHB"]);

    assert_eq!(
        result.hits[0].title.as_deref(),
        Some("Hemoglobin subunit alpha")
    );
    assert_eq!(result.hits[0].organisms, vec!["Homo sapiens".to_string()]);
    // 2DHB comes from the second entry and carries its name.
    assert_eq!(
        result.hits[2].title.as_deref(),
        Some("Hemoglobin subunit beta")
    );

    assert_eq!(result.total_count, 25);
    assert!(result.has_more);
}

#[tokio::test]
async fn test_search_limit_caps_cross_reference_expansion() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/uniprotkb/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-total-results", "2")
                .set_body_json(hemoglobin_entries()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let query = SearchQuery {
        text: Some("hemoglobin".to_string()),
        limit: 2,
        ..Default::default()
    };
    let result = provider(&server).search(&query).await.unwrap();

    // One entry alone expands past the limit; the cut applies per hit.
    let ids: Vec<&str> = result.hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["4HHB", "1HHO"]);
}

#[tokio::test]
async fn test_non_zero_offset_rejected_before_any_request() {
    let server = MockServer::start().await;

    // Paging is cursor-based upstream; a numeric offset must never be
    // silently answered with the first page.
    Mock::given(method("GET"))
        .and(path("/uniprotkb/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-total-results", "10")
                .set_body_json(hemoglobin_entries()),
        )
        .expect(0)
        .mount(&server)
        .await;

    let query = SearchQuery {
        text: Some("hemoglobin".to_string()),
        limit: 5,
        offset: 5,
        ..Default::default()
    };
    let err = provider(&server).search(&query).await.unwrap_err();
    assert!(matches!(err, PdbqError::Validation(_)));
}

#[tokio::test]
async fn test_orchestrator_serves_search_from_uniprot_primary() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/uniprotkb/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-total-results", "3")
                .set_body_json(hemoglobin_entries()),
        )
        .expect(1)
        .mount(&server)
        .await;

    // A served primary never reaches the mirror.
    Mock::given(method("GET"))
        .and(path("/solr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": { "numFound": 0, "docs": [] }
        })))
        .expect(0)
        .mount(&server)
        .await;

    let config = Config {
        rcsb: RcsbConfig {
            search_url: format!("{}/rcsb/search", server.uri()),
            graphql_url: format!("{}/graphql", server.uri()),
            files_url: format!("{}/download", server.uri()),
        },
        pdbe: PdbeConfig {
            api_url: format!("{}/pdbe", server.uri()),
            search_url: format!("{}/solr", server.uri()),
        },
        uniprot: UniprotConfig {
            search_url: format!("{}/uniprotkb/search", server.uri()),
        },
        alignment: AlignmentConfig {
            base_url: format!("{}/align", server.uri()),
            poll_interval_secs: 1,
            max_poll_attempts: 1,
        },
        http: HttpConfig {
            request_timeout_secs: 5,
        },
    };

    let orchestrator =
        Orchestrator::from_config_with_primary(&config, ProviderKind::Uniprot).unwrap();

    let query = SearchQuery {
        text: Some("hemoglobin".to_string()),
        limit: 10,
        ..Default::default()
    };
    let result = orchestrator.search(&query).await.unwrap();

    assert_eq!(result.hits.len(), 3);
    assert_eq!(result.hits[0].id.as_str(), "4HHB");
}

#[test]
fn test_provider_kind_parsing() {
    assert_eq!("rcsb".parse::<ProviderKind>().unwrap(), ProviderKind::Rcsb);
    assert_eq!(
        "UniProt".parse::<ProviderKind>().unwrap(),
        ProviderKind::Uniprot
    );
    assert!("pdbe".parse::<ProviderKind>().is_err());
}
