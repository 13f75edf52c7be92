//! PDBQ Service Library
//!
//! Uniform query surface over protein structural data sources (RCSB PDB,
//! PDBe, UniProt): multi-provider orchestration with failover, an
//! asynchronous structural-alignment job client, and an mmCIF chain
//! parser for per-chain metadata the APIs do not return.
//!
//! # Example
//!
//! ```no_run
//! use pdbq_service::config::Config;
//! use pdbq_service::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let orchestrator = Orchestrator::from_config(&config)?;
//!     let record = orchestrator.get_structure("4hhb").await?;
//!     println!("{}", record.title.unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod alignment;
pub mod config;
pub mod metadata;
pub mod mmcif;
pub mod orchestrator;
pub mod providers;
pub mod query;
pub mod similarity;
