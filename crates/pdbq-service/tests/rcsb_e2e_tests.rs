//! End-to-end tests for the RCSB provider
//!
//! Exercises the search and structure-fetch paths against mock HTTP
//! endpoints: paged search with batch enrichment, the 204 empty-result
//! convention, file/metadata chain merging, graceful degradation when
//! the coordinate file is gone, and NotFound classification for missing
//! entries.

use chrono::NaiveDate;
use pdbq_common::types::{ChainKind, SearchQuery, StructureId};
use pdbq_common::PdbqError;
use pdbq_service::config::RcsbConfig;
use pdbq_service::providers::{Provider, RcsbProvider};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> RcsbProvider {
    let config = RcsbConfig {
        search_url: format!("{}/search", server.uri()),
        graphql_url: format!("{}/graphql", server.uri()),
        files_url: format!("{}/download", server.uri()),
    };
    RcsbProvider::new(reqwest::Client::new(), &config)
}

const HEMOGLOBIN_CIF: &str = "data_4HHB\n\
#\n\
loop_\n\
_entity_poly.entity_id\n\
_entity_poly.type\n\
_entity_poly.pdbx_strand_id\n\
_entity_poly.pdbx_seq_one_letter_code_can\n\
1 'polypeptide(L)' A,C VLSPADKTNVKAAW\n\
2 'polypeptide(L)' B,D VHLTPEEKSAVTAL\n\
#\n";

#[tokio::test]
async fn test_search_returns_enriched_page() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result_set": [
                { "identifier": "1HHO", "score": 1.0 },
                { "identifier": "2DHB", "score": 0.9 },
                { "identifier": "4HHB", "score": 0.8 }
            ],
            "total_count": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "entries": [{
                    "rcsb_id": "1HHO",
                    "struct": { "title": "Oxyhemoglobin at 2.1 A resolution" },
                    "exptl": [{ "method": "X-RAY DIFFRACTION" }],
                    "rcsb_entry_info": { "resolution_combined": [2.1] },
                    "rcsb_accession_info": {
                        "initial_release_date": "1981-07-07T00:00:00Z"
                    },
                    "polymer_entities": [{
                        "rcsb_entity_source_organism": [
                            { "scientific_name": "Homo sapiens" }
                        ]
                    }]
                }]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = SearchQuery {
        text: Some("hemoglobin".to_string()),
        max_resolution: Some(2.5),
        limit: 10,
        ..Default::default()
    };
    let result = provider(&server).search(&query).await.unwrap();

    assert_eq!(result.hits.len(), 3);
    assert_eq!(result.total_count, 3);
    assert!(!result.has_more);

    // Search order survives enrichment.
    assert_eq!(result.hits[0].id.as_str(), "1HHO");
    assert_eq!(
        result.hits[0].title.as_deref(),
        Some("Oxyhemoglobin at 2.1 A resolution")
    );
    assert_eq!(result.hits[0].resolution, Some(2.1));
    assert_eq!(
        result.hits[0].release_date,
        NaiveDate::from_ymd_opt(1981, 7, 7)
    );
    assert_eq!(result.hits[0].organisms, vec!["Homo sapiens".to_string()]);
    // Ids missing from the summary batch stay bare.
    assert_eq!(result.hits[1].id.as_str(), "2DHB");
    assert!(result.hits[1].title.is_none());
}

#[tokio::test]
async fn test_search_no_content_means_empty_result() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let query = SearchQuery {
        text: Some("zzzznothing".to_string()),
        limit: 10,
        ..Default::default()
    };
    let result = provider(&server).search(&query).await.unwrap();

    assert!(result.hits.is_empty());
    assert_eq!(result.total_count, 0);
    assert!(!result.has_more);
}

#[tokio::test]
async fn test_get_structure_merges_file_and_metadata_chains() {
    let server = MockServer::start().await;

    // Metadata knows the organism but the file carries the sequences.
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("4HHB"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "entry": {
                    "struct": { "title": "Hemoglobin" },
                    "exptl": [{ "method": "X-RAY DIFFRACTION" }],
                    "rcsb_entry_info": { "resolution_combined": [1.74] },
                    "polymer_entities": [{
                        "entity_poly": {
                            "type": "polypeptide(L)",
                            "pdbx_strand_id": "A,C"
                        },
                        "rcsb_entity_source_organism": [
                            { "scientific_name": "Homo sapiens" }
                        ]
                    }]
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/download/4HHB.cif"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HEMOGLOBIN_CIF))
        .expect(1)
        .mount(&server)
        .await;

    let id = StructureId::parse("4hhb").unwrap();
    let record = provider(&server).get_structure(&id).await.unwrap();

    assert_eq!(record.title.as_deref(), Some("Hemoglobin"));
    assert_eq!(record.resolution, Some(1.74));
    assert_eq!(record.chains.len(), 4);

    let chain_a = record.chains.iter().find(|c| c.id == "A").unwrap();
    assert_eq!(chain_a.kind, ChainKind::Protein);
    assert_eq!(chain_a.sequence.as_deref(), Some("VLSPADKTNVKAAW"));
    assert_eq!(chain_a.length, 14);
    assert_eq!(chain_a.organism.as_deref(), Some("Homo sapiens"));

    // Chain B exists only in the file; no organism to inherit.
    let chain_b = record.chains.iter().find(|c| c.id == "B").unwrap();
    assert_eq!(chain_b.sequence.as_deref(), Some("VHLTPEEKSAVTAL"));
    assert!(chain_b.organism.is_none());
}

#[tokio::test]
async fn test_get_structure_degrades_without_coordinate_file() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "entry": {
                    "struct": { "title": "Metadata-only entry" },
                    "exptl": [{ "method": "ELECTRON MICROSCOPY" }],
                    "polymer_entities": null
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/download/9XYZ.cif"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let id = StructureId::parse("9XYZ").unwrap();
    let record = provider(&server).get_structure(&id).await.unwrap();

    // Topology unknown, metadata intact.
    assert!(record.chains.is_empty());
    assert_eq!(record.title.as_deref(), Some("Metadata-only entry"));
    assert_eq!(record.method.as_deref(), Some("ELECTRON MICROSCOPY"));
}

#[tokio::test]
async fn test_get_structure_missing_entry_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "entry": null }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/download/0ZZZ.cif"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let id = StructureId::parse("0ZZZ").unwrap();
    let err = provider(&server).get_structure(&id).await.unwrap_err();
    assert!(matches!(err, PdbqError::NotFound(_)));
}
