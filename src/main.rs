use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use graph::{ChangesetGraph, DATE_FORMAT};
use hg2git_core::{HgSource, MigrateConfig, Migration};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hg2git")]
#[command(about = "Convert a Mercurial repository into a Git repository", long_about = None)]
struct Cli {
    /// Log more; repeat for debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone a Mercurial repository and replay its history as Git commits
    Convert {
        /// Mercurial repository to convert (path or URL)
        source: String,
        /// Directory to create; must not exist
        destination: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
        /// Write the changeset to commit mapping as JSON
        #[arg(long)]
        mapping: Option<PathBuf>,
    },
    /// Load the history and print statistics
    Inspect {
        /// Mercurial working copy
        #[arg(default_value = ".")]
        source: PathBuf,
        /// Read saved `hg log -v` output instead of running hg
        #[arg(long)]
        log_file: Option<PathBuf>,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Show the branch, merge and commit steps a conversion would take
    Plan {
        /// Mercurial working copy
        #[arg(default_value = ".")]
        source: PathBuf,
        /// Read saved `hg log -v` output instead of running hg
        #[arg(long)]
        log_file: Option<PathBuf>,
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Abort on malformed log lines and duplicate changesets
    #[arg(long)]
    strict: bool,
    /// Name of the branch the newest line of history ends up on
    #[arg(long)]
    main_branch: Option<String>,
    /// Do not replay tags
    #[arg(long)]
    no_tags: bool,
    /// Skip `git gc` at the end
    #[arg(long)]
    no_compact: bool,
}

impl ConfigArgs {
    fn load(&self) -> Result<MigrateConfig> {
        let mut config = match &self.config {
            Some(path) => MigrateConfig::load_from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => MigrateConfig::default(),
        };
        if self.strict {
            config.strict = true;
        }
        if let Some(branch) = &self.main_branch {
            config.main_branch = branch.clone();
        }
        if self.no_tags {
            config.tags = false;
        }
        if self.no_compact {
            config.compact = false;
        }
        Ok(config)
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_graph(
    migration: &Migration,
    source: &Path,
    log_file: Option<&Path>,
) -> Result<ChangesetGraph> {
    match log_file {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            migration
                .load_graph_from_reader(BufReader::new(file))
                .with_context(|| format!("failed to load history from {}", path.display()))
        }
        None => {
            let hg = HgSource::new(source, migration.config().hg.as_str());
            migration
                .load_graph(&hg)
                .with_context(|| format!("failed to load history of {}", source.display()))
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Convert {
            source,
            destination,
            config,
            mapping,
        } => {
            let migration = Migration::new(config.load()?)?;
            let report = migration
                .convert(&source, &destination)
                .with_context(|| format!("failed to convert {source}"))?;

            if let Some(path) = mapping {
                let json = report.mapping_json()?;
                std::fs::write(&path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(path = %path.display(), "wrote changeset mapping");
            }

            println!(
                "Converted {} changesets into {} ({} forks, {} merges, {} tags)",
                report.replayed,
                destination.display(),
                report.forks,
                report.merges,
                report.tags
            );
            if report.conflicted_merges > 0 {
                println!("{} merges stopped on conflicts", report.conflicted_merges);
            }
            if report.skipped > 0 {
                println!("{} changesets after a serial gap were skipped", report.skipped);
            }
        }
        Commands::Inspect {
            source,
            log_file,
            config,
        } => {
            let migration = Migration::new(config.load()?)?;
            let graph = load_graph(&migration, &source, log_file.as_deref())?;
            let stats = graph.stats();

            println!("Changesets: {}", stats.total_changesets);
            println!("Edges:      {}", stats.total_edges);
            println!("Merges:     {}", stats.merge_changesets);
            println!("Roots:      {}", stats.root_changesets);
            println!("Leaves:     {}", stats.leaf_changesets);
            println!("Tags:       {}", stats.tags);
            if let Some(head) = graph.head() {
                let date = head
                    .date
                    .map(|d| d.format(DATE_FORMAT).to_string())
                    .unwrap_or_default();
                println!("Head:       {} {} {}", head, head.user, date);
            }
            if stats.contiguous < stats.total_changesets {
                println!(
                    "Warning: only {} changesets are reachable before the first serial gap",
                    stats.contiguous
                );
            }
            if stats.has_unrelated_roots {
                println!("Note: history has unrelated roots");
            }
        }
        Commands::Plan {
            source,
            log_file,
            config,
        } => {
            let migration = Migration::new(config.load()?)?;
            let graph = load_graph(&migration, &source, log_file.as_deref())?;
            let (report, dest) = migration.dry_run(&graph)?;

            for op in dest.operations() {
                println!("{op}");
            }
            println!();
            for step in &report.mapping {
                let merged = match step.merged {
                    Some(outcome) => format!(" merge:{outcome:?}"),
                    None => String::new(),
                };
                println!(
                    "{}:{} -> {} {} {:?}{}",
                    step.serial, step.source_id, step.branch, step.commit, step.topology, merged
                );
            }
        }
    }

    Ok(())
}
