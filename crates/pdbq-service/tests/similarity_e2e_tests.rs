//! End-to-end test for structure-mode similarity ranking
//!
//! Five candidates fan out into five concurrent alignment jobs against a
//! mock service. Two submissions are rejected outright; the other three
//! complete with distinct TM-scores. The batch must yield exactly the
//! three survivors, ranked by TM-score descending, with no error
//! surfaced for the failures.

use pdbq_common::types::{SimilarityMode, StructureId};
use pdbq_service::alignment::{AlignmentAlgorithm, AlignmentClient};
use pdbq_service::config::AlignmentConfig;
use pdbq_service::metadata::EnrichmentClient;
use pdbq_service::providers::SimilarityCandidate;
use pdbq_service::similarity::SimilarityMerger;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn candidate(id: &str) -> SimilarityCandidate {
    SimilarityCandidate {
        id: StructureId::parse(id).unwrap(),
        sequence_identity: None,
        e_value: None,
        shape_similarity: None,
    }
}

fn complete_body(uuid: &str, tm_score: f64) -> serde_json::Value {
    serde_json::json!({
        "info": { "uuid": uuid, "status": "COMPLETE" },
        "results": [{
            "summary": {
                "scores": [
                    { "type": "TM-score", "value": tm_score },
                    { "type": "RMSD", "value": 2.0 }
                ],
                "n_aln_residue_pairs": 100,
                "n_modeled_residues": [200]
            }
        }]
    })
}

/// Route a submission mentioning `id` to a fixed ticket, and that
/// ticket's polls to a COMPLETE payload with the given TM-score.
async fn mount_success(server: &MockServer, id: &str, uuid: &str, tm_score: f64) {
    Mock::given(method("POST"))
        .and(path("/submit"))
        .and(body_string_contains(id))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "uuid": uuid })),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/results"))
        .and(query_param("uuid", uuid))
        .respond_with(ResponseTemplate::new(200).set_body_json(complete_body(uuid, tm_score)))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_rejection(server: &MockServer, id: &str) {
    Mock::given(method("POST"))
        .and(path("/submit"))
        .and(body_string_contains(id))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(server)
        .await;
}

fn merger(server: &MockServer) -> SimilarityMerger {
    let client = reqwest::Client::new();
    let config = AlignmentConfig {
        base_url: server.uri(),
        poll_interval_secs: 2,
        max_poll_attempts: 15,
    };
    let alignment = AlignmentClient::new(client.clone(), &config)
        .with_timing(Duration::from_millis(5), 15);
    let enrichment = EnrichmentClient::new(client, format!("{}/graphql", server.uri()));
    SimilarityMerger::new(alignment, enrichment)
}

#[tokio::test]
async fn test_partial_alignment_failures_are_tolerated() {
    let server = MockServer::start().await;

    mount_success(&server, "1AAA", "job-a", 0.62).await;
    mount_rejection(&server, "2BBB").await;
    mount_success(&server, "3CCC", "job-c", 0.91).await;
    mount_rejection(&server, "4DDD").await;
    mount_success(&server, "5EEE", "job-e", 0.74).await;

    // Survivor enrichment; one title is enough to show it lands.
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "entries": [{
                    "rcsb_id": "3CCC",
                    "struct": { "title": "Best match" },
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

    let reference = StructureId::parse("4HHB").unwrap();
    let candidates = vec![
        candidate("1AAA"),
        candidate("2BBB"),
        candidate("3CCC"),
        candidate("4DDD"),
        candidate("5EEE"),
    ];

    let hits = merger(&server)
        .rank(
            &reference,
            Some("A"),
            SimilarityMode::Structure,
            candidates,
            5,
            AlignmentAlgorithm::TmAlign,
        )
        .await
        .unwrap();

    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["3CCC", "5EEE", "1AAA"]);

    assert_eq!(hits[0].tm_score, Some(0.91));
    assert_eq!(hits[0].title.as_deref(), Some("Best match"));
    assert_eq!(hits[0].organisms, vec!["Homo sapiens".to_string()]);
    assert_eq!(hits[0].coverage, Some(50.0));
    // Unenriched survivors stay bare but ranked.
    assert_eq!(hits[2].tm_score, Some(0.62));
    assert!(hits[2].title.is_none());
}

#[tokio::test]
async fn test_all_alignments_failing_yields_empty_ranking() {
    let server = MockServer::start().await;

    mount_rejection(&server, "1AAA").await;
    mount_rejection(&server, "2BBB").await;

    // An empty survivor set never reaches the enrichment endpoint.
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "entries": [] }
        })))
        .expect(0)
        .mount(&server)
        .await;

    let reference = StructureId::parse("4HHB").unwrap();
    let hits = merger(&server)
        .rank(
            &reference,
            None,
            SimilarityMode::Structure,
            vec![candidate("1AAA"), candidate("2BBB")],
            5,
            AlignmentAlgorithm::TmAlign,
        )
        .await
        .unwrap();

    assert!(hits.is_empty());
}
