use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use ingest::UniProtClient;
use pipeline::{Pipeline, PipelineConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "phospho-atlas")]
#[command(about = "Extract kinase-substrate interactions from UniProt annotations")]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run extraction and reconciliation for a set of proteins
    Run {
        /// UniProt accessions to process (repeatable or comma-separated)
        #[arg(long = "accession", value_delimiter = ',')]
        accessions: Vec<String>,

        /// UniProt query selecting the proteins instead of explicit accessions
        #[arg(long, conflicts_with = "accessions")]
        query: Option<String>,

        /// Maximum proteins taken from --query
        #[arg(long, default_value_t = 100)]
        limit: usize,

        /// PhosphoSitePlus Kinase_Substrate_Dataset file
        #[arg(long)]
        reference: Option<PathBuf>,

        /// TOML config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory; a run_<id> folder is created inside
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Parse a saved extraction response and print the records
    Parse {
        /// File holding the raw response text
        path: PathBuf,

        /// Symbol of the annotated protein
        #[arg(long)]
        substrate: Option<String>,
    },
    /// Print the extraction request for an annotation text
    Prompt {
        /// Substrate gene symbol
        #[arg(long)]
        substrate: String,

        /// Annotation text
        text: String,
    },
}

fn init_tracing(json: bool) {
    let default_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Commands::Run {
            accessions,
            query,
            limit,
            reference,
            config,
            out,
        } => {
            let mut config = PipelineConfig::load(config.as_deref())?;
            if let Some(path) = reference {
                config.reference.path = Some(path);
            }
            if let Some(dir) = out {
                config.output.dir = dir;
            }

            let accessions = match query {
                Some(query) => {
                    let client = UniProtClient::new(config.uniprot_config())?;
                    client
                        .search_accessions(&query, limit)
                        .await
                        .with_context(|| format!("UniProt search failed for {query:?}"))?
                }
                None => accessions,
            };
            if accessions.is_empty() {
                bail!("no proteins to process: pass --accession or --query");
            }

            let output_dir = config.output.dir.clone();
            let pipeline = Pipeline::from_config(config)?;
            let output = pipeline.run(&accessions).await;
            let dir = output.write_to(&output_dir).await?;

            println!("{}", serde_json::to_string_pretty(&output.summary)?);
            println!("Output written to {}", dir.display());
        }
        Commands::Parse { path, substrate } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let mut records = extract::parse(&raw);
            if let Some(symbol) = substrate {
                for record in &mut records {
                    record.bind_substrate(&symbol);
                }
            }
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Commands::Prompt { substrate, text } => {
            let request = extract::build_extraction_prompt(&text, &substrate)?;
            println!("{}", request.prompt);
        }
    }

    Ok(())
}
