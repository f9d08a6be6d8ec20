//! `mlj` - offline job plan and inspection tool

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use mlj_config::{interval_ms, DatafeedConfig, JobConfig};
use mlj_creator::{CreatorSettings, DataSource, JobCreator, OfflineApi, WizardPlan};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn cli() -> Command {
    Command::new("mlj")
        .version(mlj_creator::VERSION)
        .about("Build and inspect anomaly detection job definitions offline")
        .subcommand_required(true)
        .arg(
            Arg::new("settings")
                .long("settings")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Creator settings file (TOML)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Write logs as JSON"),
        )
        .subcommand(
            Command::new("plan")
                .about("Print the job and datafeed a wizard plan produces")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Plan file (YAML or JSON)"),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Load an existing job and datafeed and summarise them")
                .arg(
                    Arg::new("job")
                        .long("job")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Job definition (JSON)"),
                )
                .arg(
                    Arg::new("datafeed")
                        .long("datafeed")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Datafeed definition (JSON)"),
                ),
        )
        .subcommand(
            Command::new("interval")
                .about("Print an interval in milliseconds")
                .arg(Arg::new("value").required(true).help("Interval, e.g. 15m"))
                .arg(
                    Arg::new("calendar-units")
                        .long("calendar-units")
                        .action(ArgAction::SetTrue)
                        .help("Also accept w, M and y"),
                ),
        )
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("mlj_creator=info".parse()?);
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
    Ok(())
}

fn load_settings(args: &ArgMatches) -> anyhow::Result<CreatorSettings> {
    match args.get_one::<PathBuf>("settings") {
        Some(path) => CreatorSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display())),
        None => Ok(CreatorSettings::default()),
    }
}

fn run_plan(args: &ArgMatches, settings: CreatorSettings) -> anyhow::Result<()> {
    let path = args
        .get_one::<PathBuf>("file")
        .context("plan file is required")?;
    let plan = WizardPlan::load(path).with_context(|| format!("reading {}", path.display()))?;
    let api = Arc::new(OfflineApi);
    let creator = plan.build(api.clone(), api, settings)?;

    let datafeed = creator.datafeed_for_submission();
    println!("{}", creator.formatted_job_json()?);
    println!("{}", datafeed.to_pretty_json()?);
    Ok(())
}

fn run_inspect(args: &ArgMatches, settings: CreatorSettings) -> anyhow::Result<()> {
    let job_path = args.get_one::<PathBuf>("job").context("job file is required")?;
    let datafeed_path = args
        .get_one::<PathBuf>("datafeed")
        .context("datafeed file is required")?;

    let job = JobConfig::from_json(&std::fs::read_to_string(job_path)?)
        .with_context(|| format!("parsing {}", job_path.display()))?;
    let datafeed = DatafeedConfig::from_json(&std::fs::read_to_string(datafeed_path)?)
        .with_context(|| format!("parsing {}", datafeed_path.display()))?;

    let title = datafeed.indices.join(",");
    let api = Arc::new(OfflineApi);
    let mut creator = JobCreator::new(
        api.clone(),
        api,
        DataSource::new(title),
        None,
        datafeed.query.clone(),
        settings,
    );
    creator.override_configs(job, datafeed);

    println!("job:              {}", creator.job_id());
    println!("datafeed:         {}", creator.datafeed_id());
    println!("bucket span:      {} ({} ms)", creator.bucket_span(), creator.bucket_span_ms());
    println!("sparse data:      {}", creator.sparse_data());
    println!("dedicated index:  {}", creator.use_dedicated_index());
    println!("influencers:      {}", creator.influencers().join(", "));
    for (i, entry) in creator.detector_entries().iter().enumerate() {
        println!(
            "detector {i}:       {} on {} ({})",
            entry.detector.function, entry.field.id, entry.aggregation.title
        );
    }
    let kept = creator.runtime_mappings_for_save().unwrap_or_default();
    println!(
        "runtime mappings: {} kept of {}",
        kept.len(),
        creator.runtime_mappings().map_or(0, |m| m.len())
    );
    println!("{}", serde_json::to_string_pretty(&kept)?);
    Ok(())
}

fn run_interval(args: &ArgMatches) -> anyhow::Result<()> {
    let value = args
        .get_one::<String>("value")
        .context("interval is required")?;
    let es_units_only = !args.get_flag("calendar-units");
    let ms = interval_ms(value, es_units_only)
        .with_context(|| format!("{value:?} is not a valid interval"))?;
    println!("{ms}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json-logs"))?;
    let settings = load_settings(&matches)?;

    match matches.subcommand() {
        Some(("plan", args)) => run_plan(args, settings),
        Some(("inspect", args)) => run_inspect(args, settings),
        Some(("interval", args)) => run_interval(args),
        _ => unreachable!("subcommand_required"),
    }
}
