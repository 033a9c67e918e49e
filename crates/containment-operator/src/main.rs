//! containment-operator binary

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use containment_core::reconciler::{Outcome, Reconciler};
use containment_core::store::IntentStore;
use containment_core::target::{DelimitedResolver, TargetResolver};
use containment_core::types::ContainmentIntent;
use containment_operator::file_store::read_intent_file;
use containment_operator::manifest;
use containment_operator::telemetry::{self, LogFormat};
use containment_operator::{
    Controller, FileIntentStore, ManifestExecutor, OperatorSettings, Watcher,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

/// Attempts per intent for redeliverable errors in `--once` mode
const ONCE_ATTEMPTS: u32 = 3;

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("Operator settings (TOML with [reconciler] and [controller] tables)")
}

fn cli() -> Command {
    Command::new("containment-operator")
        .version(containment_core::VERSION)
        .about("Gated, idempotent incident containment for cluster workloads")
        .subcommand_required(true)
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("pretty")
                .value_parser(value_parser!(LogFormat))
                .help("Log encoding: pretty or json"),
        )
        .subcommand(
            Command::new("run")
                .about("Reconcile intents from a directory")
                .arg(
                    Arg::new("intents")
                        .long("intents")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory of <namespace>.<name>.yaml|json intent documents"),
                )
                .arg(
                    Arg::new("manifests")
                        .long("manifests")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory receiving rendered containment manifests"),
                )
                .arg(config_arg())
                .arg(
                    Arg::new("workers")
                        .long("workers")
                        .value_parser(value_parser!(usize))
                        .help("Concurrent reconcile workers"),
                )
                .arg(
                    Arg::new("once")
                        .long("once")
                        .action(ArgAction::SetTrue)
                        .help("Reconcile every intent once and exit"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Check intent documents without acting on them")
                .arg(
                    Arg::new("intents")
                        .long("intents")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory of intent documents"),
                )
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("render")
                .about("Print the manifest an intent would produce")
                .arg(
                    Arg::new("intent")
                        .long("intent")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Intent document (.yaml or .json)"),
                )
                .arg(config_arg()),
        )
        .subcommand(Command::new("schema").about("Print the JSON Schema of intent documents"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let format = matches
        .get_one::<LogFormat>("log-format")
        .copied()
        .unwrap_or_default();
    telemetry::init(format).map_err(|e| anyhow::anyhow!(e))?;

    match matches.subcommand() {
        Some(("run", args)) => run(args).await,
        Some(("validate", args)) => validate(args).await,
        Some(("render", args)) => render(args),
        Some(("schema", _)) => schema(),
        _ => bail!("no subcommand given"),
    }
}

fn path_arg<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a Path> {
    args.get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .with_context(|| format!("--{name} is required"))
}

fn load_settings(args: &ArgMatches) -> Result<OperatorSettings> {
    let path = args.get_one::<PathBuf>("config").map(PathBuf::as_path);
    OperatorSettings::load(path).context("failed to load operator settings")
}

async fn run(args: &ArgMatches) -> Result<()> {
    let intents = path_arg(args, "intents")?;
    let manifests = path_arg(args, "manifests")?;
    let mut settings = load_settings(args)?;
    if let Some(workers) = args.get_one::<usize>("workers") {
        settings = settings.with_workers(*workers);
        settings.validate().context("invalid --workers")?;
    }

    let store = Arc::new(
        FileIntentStore::open(intents)
            .with_context(|| format!("cannot open intents directory {}", intents.display()))?,
    );
    let executor = Arc::new(ManifestExecutor::new(manifests));
    let reconciler = Reconciler::new(store.clone(), executor, settings.reconciler.clone())
        .with_span(tracing::info_span!("containment"));
    let controller = Controller::new(reconciler, settings.controller.clone());

    tracing::info!(
        intents = %intents.display(),
        manifests = %manifests.display(),
        threshold = settings.reconciler.confidence_threshold,
        "containment operator starting"
    );

    if args.get_flag("once") {
        let ids = store.list().await.context("cannot list intents")?;
        let mut failed = 0;
        for once in controller.run_once(ids, ONCE_ATTEMPTS).await {
            match once.result {
                Ok(report) => println!("{}\t{}", once.id, describe(&report.outcome)),
                Err(err) => {
                    failed += 1;
                    println!("{}\terror: {err}", once.id);
                }
            }
        }
        if failed > 0 {
            bail!("{failed} intent(s) could not be reconciled");
        }
        return Ok(());
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let watcher = Watcher::new(
        store.clone(),
        controller.queue(),
        settings.controller.poll_interval(),
    );
    let watcher_task = tokio::spawn(watcher.run(stop_rx));

    controller
        .run(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(%err, "cannot listen for ctrl-c; running until killed");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutdown requested");
            stop_tx.send_replace(true);
        })
        .await;

    watcher_task.await.context("watcher task failed")?;
    Ok(())
}

fn describe(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Missing => "missing".to_owned(),
        Outcome::Skipped => "skipped (terminal)".to_owned(),
        Outcome::Deferred(reason) => format!("pending: {reason}"),
        Outcome::Applied(action) => format!("applied: {action}"),
        Outcome::Failed(result) => format!("failed: {result}"),
        Outcome::Retrying { attempts } => format!("pending: retrying (attempt {attempts})"),
    }
}

fn check(intent: &ContainmentIntent, resolver: &DelimitedResolver) -> Result<String> {
    let action = intent.spec.suggested_action.resolve()?;
    let target = resolver.resolve(&intent.spec.alert_id)?;
    Ok(format!("{action} -> {target}"))
}

async fn validate(args: &ArgMatches) -> Result<()> {
    let dir = path_arg(args, "intents")?;
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let settings = load_settings(args)?;
    let resolver = DelimitedResolver::new(settings.reconciler.default_namespace);
    let store = FileIntentStore::open(dir)?;

    let mut invalid = 0;
    for (path, doc) in store.scan().await? {
        let verdict = doc
            .map_err(anyhow::Error::from)
            .and_then(|intent| check(&intent, &resolver));
        match verdict {
            Ok(summary) => println!("ok\t{}\t{summary}", path.display()),
            Err(err) => {
                invalid += 1;
                println!("invalid\t{}\t{err}", path.display());
            }
        }
    }
    if invalid > 0 {
        bail!("{invalid} invalid intent document(s)");
    }
    Ok(())
}

fn render(args: &ArgMatches) -> Result<()> {
    let path = path_arg(args, "intent")?;
    let settings = load_settings(args)?;
    let intent = read_intent_file(path).with_context(|| format!("cannot read {}", path.display()))?;

    let action = intent.spec.suggested_action.resolve()?;
    let target = DelimitedResolver::new(settings.reconciler.default_namespace)
        .resolve(&intent.spec.alert_id)?;
    if intent.spec.dry_run {
        eprintln!("note: intent is dry-run; the operator would not apply this manifest");
    }
    println!("{}", serde_json::to_string_pretty(&manifest::render(action, &target))?);
    Ok(())
}

fn schema() -> Result<()> {
    let schema = schemars::schema_for!(ContainmentIntent);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
