use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "haul",
    about = "GridHaul — workflow chunking and replication rule inspection",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a workflow snapshot into replication chunks.
    ///
    /// The snapshot is a JSON export of the workflow's block footprints
    /// (sizes and locations, plus optional parent linkage). Location-less
    /// parent blocks are pruned before chunking, the way the injection
    /// pipeline prunes them.
    Plan {
        /// Path to the workflow JSON snapshot
        #[arg(short, long)]
        workflow: String,
        /// Number of chunks to aim for
        #[arg(short, long, default_value = "1")]
        chunks: usize,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Evaluate the replication rules guarding a dataset.
    ///
    /// Classifies each rule as usable, recreatable, or permanently
    /// failed, and lists the destinations the dataset can be considered
    /// protected at.
    Rules {
        /// Dataset or block name the rules belong to
        #[arg(short, long)]
        target: String,
        /// Path to a JSON list of rule records
        #[arg(short, long)]
        rules: String,
        /// Days a stuck rule may age before it is recreated
        #[arg(long, default_value = "7")]
        stuck_limit_days: u64,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("haul=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Plan {
            workflow,
            chunks,
            format,
        } => commands::plan::run(&workflow, chunks, &format),
        Commands::Rules {
            target,
            rules,
            stuck_limit_days,
            format,
        } => commands::rules::run(&target, &rules, stuck_limit_days, &format),
    }
}
