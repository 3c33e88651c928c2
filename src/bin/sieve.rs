//! sieve - contig length filtering CLI
//!
//! Command-line interface for distribution-driven sequence length filtering.

use clap::{Parser, Subcommand, ValueEnum};
use contig_sieve::breakpoint::{analyze_breakpoints, BreakpointConfig, TieBreak};
use contig_sieve::data::LengthSet;
use contig_sieve::error::Result;
use contig_sieve::filter::{N50Params, NaturalParams};
use contig_sieve::model::{ComponentSelection, MixtureConfig};
use contig_sieve::optimize::{find_optimal_cutoff, optimize_with_retention, DEFAULT_STEP};
use contig_sieve::pipeline::{Pipeline, PipelineConfig};
use contig_sieve::profile::profile_lengths;
use contig_sieve::transform::TransformKind;
use std::path::{Path, PathBuf};

/// CLI-friendly transform enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliTransform {
    /// Box-Cox with maximum-likelihood lambda
    BoxCox,
    /// ln(x + 1)
    Log,
    /// Fit on raw lengths
    None,
}

impl From<CliTransform> for TransformKind {
    fn from(kind: CliTransform) -> Self {
        match kind {
            CliTransform::BoxCox => TransformKind::BoxCox,
            CliTransform::Log => TransformKind::Log,
            CliTransform::None => TransformKind::None,
        }
    }
}

/// Output formats for profiles.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Yaml,
}

/// Distribution-driven contig length filtering
#[derive(Parser)]
#[command(name = "sieve")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a filter pipeline from a YAML or JSON configuration file
    Run {
        /// Path to pipeline configuration
        #[arg(short, long)]
        config: PathBuf,

        /// Path to the id/length TSV
        #[arg(short, long)]
        lengths: PathBuf,

        /// Output path for the filtered id/length TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Output path for the JSON report
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Profile a length table
    Profile {
        /// Path to the id/length TSV
        #[arg(short, long)]
        lengths: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Locate the natural breakpoint and print the analysis as JSON
    Breakpoints {
        /// Path to the id/length TSV
        #[arg(short, long)]
        lengths: PathBuf,

        /// Cutoff placement between adjacent components
        #[arg(long, default_value = "midpoint")]
        tie_break: TieBreak,

        /// Transform applied before fitting
        #[arg(long, value_enum, default_value = "box-cox")]
        transform: CliTransform,

        /// Component selection: bic, aic, loo or dirichlet
        #[arg(long, default_value = "bic")]
        selection: ComponentSelection,

        /// Random seed (default: 42)
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Maximum number of components
        #[arg(long, default_value = "10")]
        max_components: usize,
    },

    /// Search for the minimum length that maximises N50
    Optimize {
        /// Path to the id/length TSV
        #[arg(short, long)]
        lengths: PathBuf,

        /// Smallest cutoff to try (default: a tenth of the shortest length)
        #[arg(long)]
        min_cutoff: Option<u64>,

        /// Largest cutoff to try (default: the median length)
        #[arg(long)]
        max_cutoff: Option<u64>,

        /// Distance between cutoffs
        #[arg(long, default_value_t = DEFAULT_STEP)]
        step: u64,

        /// Keep at least this percentage of sequences
        #[arg(long)]
        min_sequence_pct: Option<f64>,

        /// Keep at least this percentage of total length
        #[arg(long)]
        min_length_pct: Option<f64>,
    },

    /// Generate an example pipeline configuration
    Example {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "pipeline.yaml")]
        output: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            lengths,
            output,
            report,
        } => cmd_run(&config, &lengths, &output, report.as_deref()),

        Commands::Profile { lengths, format } => cmd_profile(&lengths, format),

        Commands::Breakpoints {
            lengths,
            tie_break,
            transform,
            selection,
            seed,
            max_components,
        } => {
            let mixture = MixtureConfig::default()
                .with_transform(transform.into())
                .with_selection(selection)
                .with_seed(seed)
                .with_max_components(max_components);
            let config = BreakpointConfig::default().with_tie_break(tie_break);
            cmd_breakpoints(&lengths, &mixture, &config)
        }

        Commands::Optimize {
            lengths,
            min_cutoff,
            max_cutoff,
            step,
            min_sequence_pct,
            min_length_pct,
        } => cmd_optimize(
            &lengths,
            N50Params {
                min_cutoff,
                max_cutoff,
                step,
                min_sequence_pct,
                min_length_pct,
            },
        ),

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Run a pipeline from configuration
fn cmd_run(
    config_path: &Path,
    lengths_path: &Path,
    output_path: &Path,
    report_path: Option<&Path>,
) -> Result<()> {
    eprintln!("Loading pipeline configuration from {:?}...", config_path);
    let config = PipelineConfig::from_file(config_path)?;

    eprintln!("Loading lengths...");
    let lengths = LengthSet::from_tsv(lengths_path)?;
    eprintln!(
        "Loaded {} sequences ({} bp)",
        lengths.len(),
        lengths.total_length()
    );

    eprintln!("Running pipeline '{}'...", config.name);
    let mut pipeline = Pipeline::from_config(&config);
    let filtered = pipeline.run(&lengths)?;

    eprintln!("Writing filtered lengths to {:?}...", output_path);
    filtered.to_tsv(output_path)?;

    if let Some(report) = pipeline.report() {
        for stage in &report.stages {
            eprintln!(
                "  Stage {} ({}): {} -> {} ({:.1}% removed)",
                stage.stage,
                stage.method,
                stage.sequences_before,
                stage.sequences_after,
                stage.reduction_percent
            );
        }
        if let Some(path) = report_path {
            std::fs::write(path, report.to_json()?)?;
            eprintln!("Wrote report to {:?}", path);
        }
    }

    eprintln!("Done! {} of {} sequences kept", filtered.len(), lengths.len());
    Ok(())
}

/// Profile a length table
fn cmd_profile(lengths_path: &Path, format: OutputFormat) -> Result<()> {
    eprintln!("Loading lengths...");
    let lengths = LengthSet::from_tsv(lengths_path)?;
    let profile = profile_lengths(lengths.lengths());

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&profile)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&profile)?),
        OutputFormat::Text => print!("{}", profile),
    }
    Ok(())
}

/// Natural breakpoint analysis
fn cmd_breakpoints(
    lengths_path: &Path,
    mixture: &MixtureConfig,
    config: &BreakpointConfig,
) -> Result<()> {
    eprintln!("Loading lengths...");
    let lengths = LengthSet::from_tsv(lengths_path)?;

    eprintln!(
        "Fitting mixture ({} transform, {} selection)...",
        mixture.transform, mixture.selection
    );
    let analysis = analyze_breakpoints(lengths.lengths(), mixture, config)?;

    match analysis.selected_cutoff {
        Some(cutoff) => eprintln!(
            "Natural breakpoint at {} ({} components)",
            cutoff, analysis.component_count
        ),
        None => eprintln!("No natural breakpoint found"),
    }
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}

/// N50 cutoff search
fn cmd_optimize(lengths_path: &Path, params: N50Params) -> Result<()> {
    eprintln!("Loading lengths...");
    let lengths = LengthSet::from_tsv(lengths_path)?;
    params.validate()?;

    let search = if params.uses_retention() {
        optimize_with_retention(
            lengths.lengths(),
            params.min_sequence_pct.unwrap_or(0.0),
            params.min_length_pct.unwrap_or(0.0),
        )?
    } else {
        find_optimal_cutoff(
            lengths.lengths(),
            params.min_cutoff,
            params.max_cutoff,
            params.step,
        )?
    };

    eprintln!(
        "Best cutoff {} gives N50 {:.0} (unfiltered {:.0})",
        search.cutoff, search.n50, search.initial_n50
    );
    println!("{}", serde_json::to_string_pretty(&search)?);
    Ok(())
}

/// Write an example pipeline configuration
fn cmd_example(output_path: &Path) -> Result<()> {
    let pipeline = Pipeline::new()
        .name("example-contig-filter")
        .min_max(Some(200), None)
        .natural(NaturalParams::default())
        .adaptive();

    let config = pipeline.to_config(Some(
        "Drop very short contigs, cut at the natural breakpoint, then trim outliers",
    ));
    let yaml = config.to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example pipeline to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}
