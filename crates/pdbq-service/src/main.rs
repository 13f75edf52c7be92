//! PDBQ - Protein structure query tool

use anyhow::Result;
use clap::Parser;
use pdbq_common::logging::{init_logging, LogConfig, LogLevel};
use pdbq_common::types::{
    AnalysisCategory, DescriptorKind, DescriptorMatchMode, LigandQuery, SearchQuery,
    SimilarityMode,
};
use pdbq_service::alignment::AlignmentAlgorithm;
use pdbq_service::config::Config;
use pdbq_service::orchestrator::Orchestrator;
use pdbq_service::providers::ProviderKind;

#[derive(Parser, Debug)]
#[command(name = "pdbq")]
#[command(author, version, about = "Protein structure query tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Primary data provider: rcsb or uniprot
    #[arg(long, global = true, default_value = "rcsb")]
    provider: String,
}

#[derive(Parser, Debug)]
enum Command {
    /// Search structures by text and filters
    Search {
        /// Free-text term
        query: Option<String>,

        /// Source organism (exact scientific name)
        #[arg(long)]
        organism: Option<String>,

        /// Experimental method
        #[arg(long)]
        method: Option<String>,

        /// Maximum resolution in Ångströms
        #[arg(long)]
        max_resolution: Option<f64>,

        /// Minimum resolution in Ångströms
        #[arg(long)]
        min_resolution: Option<f64>,

        #[arg(long, default_value_t = 10)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Fetch one structure record with chains
    Get {
        /// 4-character PDB identifier
        id: String,
    },

    /// Pairwise structural alignment of two entries
    Compare {
        id_a: String,
        id_b: String,

        #[arg(long)]
        chain_a: Option<String>,

        #[arg(long)]
        chain_b: Option<String>,

        /// Alignment algorithm (jce, jfatcat-rigid, jfatcat-flexible, tm-align)
        #[arg(long, default_value = "tm-align")]
        algorithm: String,
    },

    /// Rank structures similar to a reference entry
    Similar {
        id: String,

        #[arg(long)]
        chain: Option<String>,

        /// Similarity mode: sequence or structure
        #[arg(long, default_value = "structure")]
        mode: String,

        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// Find structures containing a ligand
    Ligands {
        /// Chemical component id, e.g. ATP
        #[arg(long)]
        id: Option<String>,

        /// Free-text chemical name
        #[arg(long)]
        name: Option<String>,

        /// SMILES descriptor
        #[arg(long)]
        smiles: Option<String>,

        /// InChI descriptor
        #[arg(long)]
        inchi: Option<String>,

        /// Descriptor match mode
        #[arg(long, default_value = "graph_relaxed")]
        match_mode: String,

        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// Facet breakdown of a search result collection
    Analyze {
        /// Category: fold, function, organism, or method
        category: String,

        /// Free-text term restricting the collection
        query: Option<String>,
    },

    /// Provider liveness
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env().unwrap_or_default();
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }
    init_logging(&log_config)?;

    let primary: ProviderKind = cli.provider.parse()?;
    let config = Config::load()?;
    let orchestrator = Orchestrator::from_config_with_primary(&config, primary)?;

    match cli.command {
        Command::Search {
            query,
            organism,
            method,
            max_resolution,
            min_resolution,
            limit,
            offset,
        } => {
            let search = SearchQuery {
                text: query,
                organism,
                method,
                min_resolution,
                max_resolution,
                limit,
                offset,
            };
            let result = orchestrator.search(&search).await?;
            print_json(&result)?;
        },
        Command::Get { id } => {
            let record = orchestrator.get_structure(&id).await?;
            print_json(&record)?;
        },
        Command::Compare {
            id_a,
            id_b,
            chain_a,
            chain_b,
            algorithm,
        } => {
            let algorithm: AlignmentAlgorithm = algorithm.parse()?;
            let scores = orchestrator
                .compare_structures(
                    &id_a,
                    chain_a.as_deref(),
                    &id_b,
                    chain_b.as_deref(),
                    algorithm,
                )
                .await?;
            print_json(&scores)?;
        },
        Command::Similar {
            id,
            chain,
            mode,
            limit,
        } => {
            let mode = match mode.to_ascii_lowercase().as_str() {
                "sequence" => SimilarityMode::Sequence,
                "structure" => SimilarityMode::Structure,
                other => anyhow::bail!("unknown similarity mode: {other}"),
            };
            let hits = orchestrator
                .find_similar(&id, chain.as_deref(), mode, limit)
                .await?;
            print_json(&hits)?;
        },
        Command::Ligands {
            id,
            name,
            smiles,
            inchi,
            match_mode,
            limit,
        } => {
            let match_mode = parse_match_mode(&match_mode)?;
            let query = match (id, name, smiles, inchi) {
                (Some(id), None, None, None) => LigandQuery::ChemicalId { id },
                (None, Some(name), None, None) => LigandQuery::Name { name },
                (None, None, Some(descriptor), None) => LigandQuery::Descriptor {
                    descriptor,
                    kind: DescriptorKind::Smiles,
                    match_mode,
                },
                (None, None, None, Some(descriptor)) => LigandQuery::Descriptor {
                    descriptor,
                    kind: DescriptorKind::InChI,
                    match_mode,
                },
                _ => anyhow::bail!("provide exactly one of --id, --name, --smiles, --inchi"),
            };
            let occurrences = orchestrator.track_ligands(&query, limit).await?;
            print_json(&occurrences)?;
        },
        Command::Analyze { category, query } => {
            let category = match category.to_ascii_lowercase().as_str() {
                "fold" => AnalysisCategory::Fold,
                "function" => AnalysisCategory::Function,
                "organism" => AnalysisCategory::Organism,
                "method" => AnalysisCategory::Method,
                other => anyhow::bail!("unknown analysis category: {other}"),
            };
            let search = SearchQuery {
                text: query,
                limit: 1,
                ..Default::default()
            };
            let report = orchestrator.analyze_collection(&search, category).await?;
            print_json(&report)?;
        },
        Command::Health => {
            let report = orchestrator.health_check().await;
            print_json(&report)?;
        },
    }

    Ok(())
}

fn parse_match_mode(raw: &str) -> Result<DescriptorMatchMode> {
    match raw.to_ascii_lowercase().as_str() {
        "graph_exact" | "graph-exact" => Ok(DescriptorMatchMode::GraphExact),
        "graph_relaxed" | "graph-relaxed" => Ok(DescriptorMatchMode::GraphRelaxed),
        "graph_relaxed_stereo" | "graph-relaxed-stereo" => {
            Ok(DescriptorMatchMode::GraphRelaxedStereo)
        },
        "fingerprint" | "fingerprint_similarity" => Ok(DescriptorMatchMode::FingerprintSimilarity),
        other => anyhow::bail!("unknown match mode: {other}"),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
