//! Provider search query construction
//!
//! Translates a generic [`SearchQuery`] into the RCSB search API's JSON
//! filter tree. Building is pure and deterministic; every search and
//! analysis call goes through here, so the shape is locked down by unit
//! tests rather than by inspection of outbound traffic.

use pdbq_common::types::{AnalysisCategory, SearchQuery};
use serde::Serialize;
use serde_json::json;

// ============================================================================
// Attribute paths
// ============================================================================

const ATTR_ID: &str = "rcsb_id";
const ATTR_TITLE: &str = "struct.title";
const ATTR_MOLECULE_NAME: &str = "rcsb_polymer_entity.pdbx_description";
const ATTR_ORGANISM: &str = "rcsb_entity_source_organism.scientific_name";
const ATTR_METHOD: &str = "exptl.method";
const ATTR_RESOLUTION: &str = "rcsb_entry_info.resolution_combined";
const ATTR_PROTEIN_COUNT: &str = "rcsb_entry_info.polymer_entity_count_protein";

const FACET_FOLD: &str = "rcsb_polymer_instance_annotation.type";
const FACET_FUNCTION: &str = "rcsb_polymer_entity_annotation.type";

// ============================================================================
// Filter tree
// ============================================================================

/// One node of the provider-side boolean filter tree.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterNode {
    Group {
        logical_operator: &'static str,
        nodes: Vec<FilterNode>,
    },
    Terminal {
        service: &'static str,
        parameters: serde_json::Value,
    },
}

impl FilterNode {
    pub fn and(nodes: Vec<FilterNode>) -> Self {
        FilterNode::Group {
            logical_operator: "and",
            nodes,
        }
    }

    pub fn or(nodes: Vec<FilterNode>) -> Self {
        FilterNode::Group {
            logical_operator: "or",
            nodes,
        }
    }

    /// Text-service predicate with an explicit operator.
    pub fn text(attribute: &str, operator: &str, value: serde_json::Value) -> Self {
        FilterNode::Terminal {
            service: "text",
            parameters: json!({
                "attribute": attribute,
                "operator": operator,
                "value": value,
            }),
        }
    }

    /// Terminal against a non-text service (chemical, structure, sequence).
    pub fn service(service: &'static str, parameters: serde_json::Value) -> Self {
        FilterNode::Terminal { service, parameters }
    }
}

/// Complete search request body for the RCSB search endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub query: FilterNode,
    pub return_type: &'static str,
    pub request_options: serde_json::Value,
}

impl SearchRequest {
    /// Paginated entry-level request with relevance scores included.
    pub fn entries(query: FilterNode, limit: u32, offset: u32) -> Self {
        SearchRequest {
            query,
            return_type: "entry",
            request_options: json!({
                "paginate": { "start": offset, "rows": limit },
                "results_content_type": ["experimental"],
                "scoring_strategy": "combined",
            }),
        }
    }

    /// Aggregation-only request for one facet attribute.
    pub fn faceted(query: FilterNode, facet_name: &str, attribute: &str) -> Self {
        SearchRequest {
            query,
            return_type: "entry",
            request_options: json!({
                "paginate": { "start": 0, "rows": 0 },
                "facets": [{
                    "name": facet_name,
                    "aggregation_type": "terms",
                    "attribute": attribute,
                }],
            }),
        }
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Build the boolean filter tree for a structure search.
///
/// All present filters are AND'ed. The free-text term expands to an OR
/// over identifier (exact), title (phrase) and macromolecule name
/// (phrase), so any one match qualifies. With no filters at all the
/// query falls back to "has at least one protein entity" so it is never
/// empty.
pub fn build_search_query(query: &SearchQuery) -> FilterNode {
    let mut nodes = Vec::new();

    if let Some(text) = query.text.as_deref().filter(|t| !t.trim().is_empty()) {
        nodes.push(FilterNode::or(vec![
            FilterNode::text(ATTR_ID, "exact_match", json!(text.to_ascii_uppercase())),
            FilterNode::text(ATTR_TITLE, "contains_phrase", json!(text)),
            FilterNode::text(ATTR_MOLECULE_NAME, "contains_phrase", json!(text)),
        ]));
    }

    if let Some(organism) = query.organism.as_deref() {
        nodes.push(FilterNode::text(ATTR_ORGANISM, "exact_match", json!(organism)));
    }

    if let Some(method) = query.method.as_deref() {
        nodes.push(FilterNode::text(ATTR_METHOD, "exact_match", json!(method)));
    }

    if let Some(max) = query.max_resolution {
        nodes.push(FilterNode::text(ATTR_RESOLUTION, "less_or_equal", json!(max)));
    }

    match nodes.len() {
        0 => FilterNode::text(ATTR_PROTEIN_COUNT, "greater_or_equal", json!(1)),
        1 => nodes.remove(0),
        _ => FilterNode::and(nodes),
    }
}

/// Map an analysis category to the provider facet attribute path.
pub fn facet_attribute(category: AnalysisCategory) -> &'static str {
    match category {
        AnalysisCategory::Fold => FACET_FOLD,
        AnalysisCategory::Function => FACET_FUNCTION,
        AnalysisCategory::Organism => ATTR_ORGANISM,
        AnalysisCategory::Method => ATTR_METHOD,
    }
}
