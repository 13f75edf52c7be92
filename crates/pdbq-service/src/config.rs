//! Configuration management

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Endpoint Configuration Constants
// ============================================================================

/// Default RCSB full-text/structure search endpoint.
pub const DEFAULT_RCSB_SEARCH_URL: &str = "https://search.rcsb.org/rcsbsearch/v2/query";

/// Default RCSB GraphQL metadata endpoint.
pub const DEFAULT_RCSB_GRAPHQL_URL: &str = "https://data.rcsb.org/graphql";

/// Default RCSB coordinate file download base.
pub const DEFAULT_RCSB_FILES_URL: &str = "https://files.rcsb.org/download";

/// Default PDBe REST API base.
pub const DEFAULT_PDBE_API_URL: &str = "https://www.ebi.ac.uk/pdbe/api";

/// Default PDBe Solr search endpoint.
pub const DEFAULT_PDBE_SEARCH_URL: &str = "https://www.ebi.ac.uk/pdbe/search/pdb/select";

/// Default UniProtKB REST search endpoint.
pub const DEFAULT_UNIPROT_SEARCH_URL: &str = "https://rest.uniprot.org/uniprotkb/search";

/// Default RCSB pairwise alignment service base.
pub const DEFAULT_ALIGNMENT_URL: &str = "https://alignment.rcsb.org/api/v1/structures";

/// Default timeout for outbound HTTP requests in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Interval between alignment job polls in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Maximum alignment poll attempts before the job is declared timed out.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 15;

/// Service configuration
///
/// Immutable after construction; the shared `reqwest::Client` is built
/// once from `http` and handed by reference into every component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub rcsb: RcsbConfig,
    pub pdbe: PdbeConfig,
    pub uniprot: UniprotConfig,
    pub alignment: AlignmentConfig,
    pub http: HttpConfig,
}

/// RCSB endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RcsbConfig {
    pub search_url: String,
    pub graphql_url: String,
    pub files_url: String,
}

/// PDBe endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdbeConfig {
    pub api_url: String,
    pub search_url: String,
}

/// UniProt endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniprotConfig {
    pub search_url: String,
}

/// Alignment job service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentConfig {
    pub base_url: String,
    pub poll_interval_secs: u64,
    pub max_poll_attempts: u32,
}

impl AlignmentConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Outbound HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            rcsb: RcsbConfig {
                search_url: env_or("PDBQ_RCSB_SEARCH_URL", DEFAULT_RCSB_SEARCH_URL),
                graphql_url: env_or("PDBQ_RCSB_GRAPHQL_URL", DEFAULT_RCSB_GRAPHQL_URL),
                files_url: env_or("PDBQ_RCSB_FILES_URL", DEFAULT_RCSB_FILES_URL),
            },
            pdbe: PdbeConfig {
                api_url: env_or("PDBQ_PDBE_API_URL", DEFAULT_PDBE_API_URL),
                search_url: env_or("PDBQ_PDBE_SEARCH_URL", DEFAULT_PDBE_SEARCH_URL),
            },
            uniprot: UniprotConfig {
                search_url: env_or("PDBQ_UNIPROT_SEARCH_URL", DEFAULT_UNIPROT_SEARCH_URL),
            },
            alignment: AlignmentConfig {
                base_url: env_or("PDBQ_ALIGNMENT_URL", DEFAULT_ALIGNMENT_URL),
                poll_interval_secs: env_parsed(
                    "PDBQ_ALIGNMENT_POLL_INTERVAL",
                    DEFAULT_POLL_INTERVAL_SECS,
                ),
                max_poll_attempts: env_parsed(
                    "PDBQ_ALIGNMENT_MAX_POLLS",
                    DEFAULT_MAX_POLL_ATTEMPTS,
                ),
            },
            http: HttpConfig {
                request_timeout_secs: env_parsed(
                    "PDBQ_REQUEST_TIMEOUT",
                    DEFAULT_REQUEST_TIMEOUT_SECS,
                ),
            },
        };

        Ok(config)
    }

    /// Build the single shared HTTP client from this configuration.
    pub fn build_http_client(&self) -> anyhow::Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.http.request_timeout_secs))
            .build()?;
        Ok(client)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rcsb: RcsbConfig {
                search_url: DEFAULT_RCSB_SEARCH_URL.to_string(),
                graphql_url: DEFAULT_RCSB_GRAPHQL_URL.to_string(),
                files_url: DEFAULT_RCSB_FILES_URL.to_string(),
            },
            pdbe: PdbeConfig {
                api_url: DEFAULT_PDBE_API_URL.to_string(),
                search_url: DEFAULT_PDBE_SEARCH_URL.to_string(),
            },
            uniprot: UniprotConfig {
                search_url: DEFAULT_UNIPROT_SEARCH_URL.to_string(),
            },
            alignment: AlignmentConfig {
                base_url: DEFAULT_ALIGNMENT_URL.to_string(),
                poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
                max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            },
            http: HttpConfig {
                request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
