//! `gi` - genetic improvement from the command line
//!
//! `gi run <project>` searches for a patch that lowers the project's
//! fitness; `gi points <project>` lists the modification points of its
//! target files.

use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use gi_eval::{Harness, ProjectDescriptor, DEFAULT_DESCRIPTOR};
use gi_program::{Engine, LineEngine, MarkupEngine, Patch, Program, StatementEngine};
use gi_search::{by_name, search, EditMutator, SearchContext, SearchReport, StopCondition, ALGORITHMS, DEFAULT_BUDGET};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const GRANULARITIES: [&str; 3] = [LineEngine::NAME, StatementEngine::NAME, MarkupEngine::NAME];

fn cli() -> Command {
    let project_args = [
        Arg::new("project")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help("Project root containing the target files"),
        Arg::new("descriptor")
            .long("descriptor")
            .value_parser(value_parser!(PathBuf))
            .help("Project descriptor (default: <project>/gi.toml)"),
        Arg::new("granularity")
            .long("granularity")
            .default_value(LineEngine::NAME)
            .value_parser(GRANULARITIES)
            .help("Program representation"),
    ];

    Command::new("gi")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Genetic improvement: search the patch space of a program")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .default_value("info")
                .help("Log filter; RUST_LOG takes precedence"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("run")
                .about("Search for an improving patch")
                .args(project_args.clone())
                .arg(
                    Arg::new("algorithm")
                        .long("algorithm")
                        .default_value("local")
                        .value_parser(ALGORITHMS)
                        .help("Search algorithm"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("0")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("budget")
                        .long("budget")
                        .value_parser(value_parser!(u64))
                        .help("Time budget in seconds (default: 30)"),
                )
                .arg(
                    Arg::new("max-evaluations")
                        .long("max-evaluations")
                        .value_parser(value_parser!(u64))
                        .help("Stop after this many evaluations"),
                )
                .arg(
                    Arg::new("target")
                        .long("target")
                        .value_parser(value_parser!(f64))
                        .help("Stop once the best fitness is at or below this value"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the report as JSON"),
                ),
        )
        .subcommand(
            Command::new("points")
                .about("List modification points")
                .args(project_args)
                .arg(Arg::new("file").long("file").help("Only this target file")),
        )
}

/// Where the project lives and how to read it
#[derive(Debug, Clone)]
struct Project {
    root: PathBuf,
    descriptor: PathBuf,
    granularity: String,
}

impl Project {
    fn from_args(args: &ArgMatches) -> anyhow::Result<Self> {
        let root = args.get_one::<PathBuf>("project").context("missing project root")?.clone();
        let descriptor = args
            .get_one::<PathBuf>("descriptor")
            .cloned()
            .unwrap_or_else(|| root.join(DEFAULT_DESCRIPTOR));
        let granularity = args
            .get_one::<String>("granularity")
            .map_or(LineEngine::NAME, String::as_str)
            .to_string();
        Ok(Self {
            root,
            descriptor,
            granularity,
        })
    }

    fn load_descriptor(&self) -> anyhow::Result<ProjectDescriptor> {
        ProjectDescriptor::load(&self.descriptor)
            .with_context(|| format!("reading descriptor {}", self.descriptor.display()))
    }

    fn load_program<E: Engine>(&self, engine: E, descriptor: &ProjectDescriptor) -> anyhow::Result<Program<E>> {
        Program::load(engine, &self.root, &descriptor.target_files)
            .with_context(|| format!("loading target files under {}", self.root.display()))
    }
}

/// Search settings for `gi run`
#[derive(Debug, Clone)]
struct RunOptions {
    algorithm: String,
    seed: u64,
    stop: StopCondition,
    json: bool,
}

impl RunOptions {
    fn from_args(args: &ArgMatches) -> Self {
        let budget = args
            .get_one::<u64>("budget")
            .map_or(DEFAULT_BUDGET, |secs| Duration::from_secs(*secs));
        let mut stop = StopCondition::budget(budget);
        if let Some(max) = args.get_one::<u64>("max-evaluations") {
            stop = stop.with_max_evaluations(*max);
        }
        if let Some(target) = args.get_one::<f64>("target") {
            stop = stop.with_target(*target);
        }
        Self {
            algorithm: args.get_one::<String>("algorithm").map_or("local", String::as_str).to_string(),
            seed: args.get_one::<u64>("seed").copied().unwrap_or_default(),
            stop,
            json: args.get_flag("json"),
        }
    }
}

fn init_tracing(level: &str, json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log filter {level:?}"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = if json { builder.json().try_init() } else { builder.try_init() };
    installed.map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))
}

async fn run_with<E: Engine + Debug>(engine: E, project: &Project, options: &RunOptions) -> anyhow::Result<SearchReport> {
    let descriptor = project.load_descriptor()?;
    let program = Arc::new(project.load_program(engine, &descriptor)?);
    let algorithm = by_name(&options.algorithm)?;
    let mutator = EditMutator::new(Arc::clone(&program))?;
    let harness = Harness::new(program, descriptor, &project.root)?;
    let scratch = harness.scratch().clone();

    let mut ctx =
        SearchContext::new(Box::new(harness), Box::new(mutator), options.seed).with_stop(options.stop.clone());
    let report = search(algorithm.as_ref(), &mut ctx, Patch::new()).await;

    if let Err(e) = scratch.remove() {
        warn!(error = %e, "scratch directory left behind");
    }
    Ok(report?)
}

async fn run(args: &ArgMatches) -> anyhow::Result<()> {
    let project = Project::from_args(args)?;
    let options = RunOptions::from_args(args);
    info!(
        project = %project.root.display(),
        granularity = %project.granularity,
        algorithm = %options.algorithm,
        seed = options.seed,
        "starting run"
    );

    let report = match project.granularity.as_str() {
        g if g == LineEngine::NAME => run_with(LineEngine, &project, &options).await?,
        g if g == StatementEngine::NAME => run_with(StatementEngine, &project, &options).await?,
        g if g == MarkupEngine::NAME => run_with(MarkupEngine, &project, &options).await?,
        other => bail!("unknown granularity {other}"),
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.generate_text());
    }
    Ok(())
}

fn list_points<E: Engine>(engine: E, project: &Project, only: Option<&str>) -> anyhow::Result<Vec<String>> {
    let descriptor = project.load_descriptor()?;
    let program = project.load_program(engine, &descriptor)?;
    let files: Vec<&str> = match only {
        Some(file) => vec![file],
        None => descriptor.target_files.iter().map(String::as_str).collect(),
    };

    let mut lines = Vec::new();
    for file in files {
        for point in program.describe_points(file)? {
            let preview: String = point.preview.lines().next().unwrap_or_default().chars().take(60).collect();
            lines.push(format!("{file}:{}\t{}\t{preview}", point.index, point.location));
        }
    }
    Ok(lines)
}

fn points(args: &ArgMatches) -> anyhow::Result<()> {
    let project = Project::from_args(args)?;
    let only = args.get_one::<String>("file").map(String::as_str);
    let lines = match project.granularity.as_str() {
        g if g == LineEngine::NAME => list_points(LineEngine, &project, only)?,
        g if g == StatementEngine::NAME => list_points(StatementEngine, &project, only)?,
        g if g == MarkupEngine::NAME => list_points(MarkupEngine, &project, only)?,
        other => bail!("unknown granularity {other}"),
    };
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let level = matches.get_one::<String>("log-level").map_or("info", String::as_str);
    init_tracing(level, matches.get_flag("log-json"))?;

    match matches.subcommand() {
        Some(("run", args)) => run(args).await,
        Some(("points", args)) => points(args),
        _ => Ok(()),
    }
}
