//! dn - decision-network inference and decision engine
//!
//! Loads a network (from a definition file or a built-in preset) and answers:
//! - `inspect`: nodes, edges and topological order
//! - `check`: model and engine settings validation
//! - `infer`: posterior marginals or joints under evidence
//! - `decide`: Maximum Expected Utility decision, optionally with break-even
//! - `demo`: the fraud-detection walkthrough

use clap::{Args, Parser, Subcommand};
use dn_config::{
    get_preset, list_presets, load_engine_settings, ConfigSnapshot, LoadedSettings, NetworkSpec,
    OrderingName, PresetName,
};
use dn_core::decision::{BreakEven, DecisionError, DecisionEvaluator, DecisionResult};
use dn_core::exit_codes::ExitCode;
use dn_core::inference::{EliminationOrdering, Evidence, Observation, Posterior, VariableElimination};
use dn_core::logging::{event_names, generate_run_id, init_logging, LogConfig, LogFormat, Stage};
use dn_core::model::Network;
use dn_core::output::{Envelope, OutputFormat, TextRender};
use dn_core::{EngineConfig, Error};
use serde::Serialize;
use std::path::PathBuf;

/// Exact inference and decisions over discrete decision networks
#[derive(Parser)]
#[command(name = "dn")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Network definition file (JSON or TOML)
    #[arg(long, short = 'm', global = true, env = "DN_MODEL")]
    model: Option<PathBuf>,

    /// Built-in network used when no --model is given
    #[arg(long, global = true, default_value = "fraud")]
    preset: PresetName,

    /// Engine settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Elimination ordering heuristic (min_size, min_fill, reverse_topological)
    #[arg(long, global = true)]
    ordering: Option<OrderingName>,

    /// Explicit elimination order, comma separated (overrides --ordering)
    #[arg(long, global = true, value_delimiter = ',')]
    order: Vec<String>,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show variables, edges and topological order
    Inspect,

    /// Validate the model and engine settings
    Check,

    /// Posterior distribution of one or more variables
    Infer(InferArgs),

    /// Choose the action maximizing expected utility
    Decide(DecideArgs),

    /// Fraud-detection walkthrough on the built-in network
    Demo,

    /// List built-in networks
    Presets,
}

#[derive(Args, Debug)]
struct InferArgs {
    /// Query variables (a joint posterior when several are given)
    #[arg(required = true)]
    variables: Vec<String>,

    /// Observation VAR=STATE (repeatable)
    #[arg(short, long = "evidence")]
    evidence: Vec<Observation>,
}

#[derive(Args, Debug)]
struct DecideArgs {
    /// Decision variable
    decision: String,

    /// Utility variable
    utility: String,

    /// Observation VAR=STATE (repeatable)
    #[arg(short, long = "evidence")]
    evidence: Vec<Observation>,

    /// Also report the break-even probability of OUTCOME=STATE
    #[arg(long, value_name = "OUTCOME=STATE")]
    break_even: Option<Observation>,

    /// Actions compared for break-even (defaults to the first two)
    #[arg(long, num_args = 2, value_names = ["A", "B"])]
    between: Option<Vec<String>>,
}

/// Everything a command needs once inputs are loaded.
struct Session {
    network: Network,
    config: EngineConfig,
    snapshot: ConfigSnapshot,
}

fn main() -> std::process::ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::ArgsError.into()
            } else {
                ExitCode::Clean.into()
            };
        }
    };

    let mut log_config = LogConfig::from_env(None, cli.global.log_format);
    log_config.level = log_config
        .level
        .adjusted(cli.global.verbose, cli.global.quiet);
    init_logging(&log_config);

    let run_id = generate_run_id();
    let span = tracing::info_span!("run", run_id = %run_id);
    let _guard = span.enter();
    tracing::debug!(event = event_names::RUN_STARTED, "dn started");

    let result = match &cli.command {
        Commands::Inspect => run_inspect(&cli.global, &run_id),
        Commands::Check => run_check(&cli.global, &run_id),
        Commands::Infer(args) => run_infer(&cli.global, &run_id, args),
        Commands::Decide(args) => run_decide(&cli.global, &run_id, args),
        Commands::Demo => run_demo(&cli.global, &run_id),
        Commands::Presets => run_presets(&cli.global, &run_id),
    };

    let code = match result {
        Ok(()) => ExitCode::Clean,
        Err(err) => {
            report_error(&cli.global, &err);
            err.exit_code()
        }
    };
    tracing::debug!(event = event_names::RUN_FINISHED, exit_code = code.as_i32(), "dn finished");
    code.into()
}

fn report_error(global: &GlobalOpts, err: &Error) {
    tracing::error!(kind = err.kind(), "{}", err);
    let report = err.report();
    match global.format {
        OutputFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("{}", err.format_human()),
        },
        OutputFormat::Summary => eprintln!("{}", report.to_summary()),
        OutputFormat::Text => eprintln!("{}", err.format_human()),
        OutputFormat::Exitcode => {}
    }
}

/// Print a payload in the requested format.
fn emit<T: Serialize + TextRender>(
    global: &GlobalOpts,
    run_id: &str,
    command: &str,
    snapshot: Option<&ConfigSnapshot>,
    payload: &T,
) -> Result<(), Error> {
    match global.format {
        OutputFormat::Json => {
            let envelope = Envelope::new(run_id, command, snapshot, payload);
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        OutputFormat::Text => print!("{}", payload.to_text()),
        OutputFormat::Summary => println!("{}", payload.to_summary()),
        OutputFormat::Exitcode => {}
    }
    Ok(())
}

fn load_session(global: &GlobalOpts) -> Result<Session, Error> {
    let stage = tracing::info_span!("stage", stage = %Stage::Init);
    let _init = stage.enter();

    let LoadedSettings {
        settings,
        provenance,
    } = load_engine_settings(global.config.as_deref()).map_err(|e| {
        tracing::warn!(event = event_names::CONFIG_ERROR, error = %e, "engine settings rejected");
        e
    })?;
    if provenance.path.is_some() {
        tracing::info!(
            event = event_names::CONFIG_LOADED,
            source = %provenance.source,
            "engine settings loaded"
        );
    } else {
        tracing::debug!(event = event_names::CONFIG_DEFAULT_USED, "using built-in engine settings");
    }

    let mut config = EngineConfig::from(&settings);
    if let Some(ordering) = global.ordering {
        config = config.with_ordering(ordering.into());
    }
    if !global.order.is_empty() {
        config = config.with_ordering(EliminationOrdering::Custom(global.order.clone()));
    }

    let (spec, label, model_hash) = match &global.model {
        Some(path) => {
            let (spec, prov) = NetworkSpec::from_file(path)?;
            (spec, path.display().to_string(), prov.sha256)
        }
        None => (get_preset(global.preset), global.preset.to_string(), None),
    };

    let model_stage = tracing::info_span!("stage", stage = %Stage::Model);
    let _model = model_stage.enter();
    let network = Network::from_spec_with_tolerance(&spec, config.normalization_tolerance)
        .map_err(|e| {
            tracing::warn!(event = event_names::MODEL_INVALID, model = %label, error = %e, "model rejected");
            e
        })?;
    tracing::info!(
        event = event_names::MODEL_LOADED,
        model = %label,
        variables = network.len(),
        "model loaded"
    );

    let snapshot = ConfigSnapshot::new(&settings, &provenance, &label, model_hash.as_deref());
    Ok(Session {
        network,
        config,
        snapshot,
    })
}

fn evidence_from(observations: &[Observation]) -> Evidence {
    observations.iter().cloned().collect()
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Serialize)]
struct InspectReport {
    #[serde(flatten)]
    summary: dn_core::model::NetworkSummary,
    topological_order: Vec<String>,
}

impl TextRender for InspectReport {
    fn to_text(&self) -> String {
        format!(
            "{}Topological order: {}\n",
            self.summary.to_text(),
            self.topological_order.join(" → ")
        )
    }

    fn to_summary(&self) -> String {
        self.summary.to_summary()
    }
}

fn run_inspect(global: &GlobalOpts, run_id: &str) -> Result<(), Error> {
    let session = load_session(global)?;
    let net = &session.network;
    let report = InspectReport {
        summary: net.summary(),
        topological_order: net
            .topological_order()
            .iter()
            .map(|id| net.variable(*id).name().to_string())
            .collect(),
    };
    emit(global, run_id, "inspect", Some(&session.snapshot), &report)
}

#[derive(Serialize)]
struct CheckReport {
    status: &'static str,
    model: String,
    variables: usize,
    edges: usize,
    engine: dn_core::config::EngineConfigSummary,
}

impl TextRender for CheckReport {
    fn to_text(&self) -> String {
        format!(
            "✓ model {}: {} variables, {} edges\n✓ engine: ordering {}, prune {}, cache {}\n",
            self.model,
            self.variables,
            self.edges,
            self.engine.ordering,
            self.engine.prune_barren,
            self.engine.cache_orders
        )
    }

    fn to_summary(&self) -> String {
        format!("[{}] check: OK", self.model)
    }
}

fn run_check(global: &GlobalOpts, run_id: &str) -> Result<(), Error> {
    let session = load_session(global)?;
    if let EliminationOrdering::Custom(names) = &session.config.ordering {
        for name in names {
            session.network.lookup(name)?;
        }
    }
    let report = CheckReport {
        status: "ok",
        model: session.snapshot.model.clone(),
        variables: session.network.len(),
        edges: session.network.edges().len(),
        engine: session.config.summary(),
    };
    emit(global, run_id, "check", Some(&session.snapshot), &report)
}

fn run_infer(global: &GlobalOpts, run_id: &str, args: &InferArgs) -> Result<(), Error> {
    let session = load_session(global)?;
    let stage = tracing::info_span!("stage", stage = %Stage::Infer);
    let _infer = stage.enter();

    let engine = VariableElimination::with_config(&session.network, session.config.clone());
    let evidence = evidence_from(&args.evidence);
    let posterior = engine.infer_joint(args.variables.as_slice(), &evidence)?;
    emit(global, run_id, "infer", Some(&session.snapshot), &posterior)
}

#[derive(Serialize)]
struct DecideReport {
    #[serde(flatten)]
    decision: DecisionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    break_even: Option<Option<BreakEven>>,
}

impl TextRender for DecideReport {
    fn to_text(&self) -> String {
        let mut text = self.decision.to_text();
        match &self.break_even {
            Some(Some(b)) => text.push_str(&format!("  {}", b.to_text())),
            Some(None) => text.push_str("  No break-even point in [0, 1]\n"),
            None => {}
        }
        text
    }

    fn to_summary(&self) -> String {
        self.decision.to_summary()
    }
}

fn run_decide(global: &GlobalOpts, run_id: &str, args: &DecideArgs) -> Result<(), Error> {
    let session = load_session(global)?;
    let stage = tracing::info_span!("stage", stage = %Stage::Decide);
    let _decide = stage.enter();

    let engine = VariableElimination::with_config(&session.network, session.config.clone());
    let evaluator = DecisionEvaluator::new(&engine);
    let evidence = evidence_from(&args.evidence);
    let decision = evaluator.choose_action(&args.decision, &args.utility, &evidence)?;

    let break_even = match &args.break_even {
        Some(outcome) => {
            let (a, b) = match args.between.as_deref() {
                Some([a, b]) => (a.clone(), b.clone()),
                _ => first_two_actions(&session.network, &args.decision)?,
            };
            Some(evaluator.break_even_probability(
                &args.decision,
                &args.utility,
                &a,
                &b,
                &outcome.variable,
                &outcome.state,
                &evidence,
            )?)
        }
        None => None,
    };

    let report = DecideReport {
        decision,
        break_even,
    };
    emit(global, run_id, "decide", Some(&session.snapshot), &report)
}

fn first_two_actions(network: &Network, decision: &str) -> Result<(String, String), Error> {
    match network.lookup(decision)?.states() {
        [a, b, ..] => Ok((a.clone(), b.clone())),
        _ => Err(DecisionError::BreakEvenUnsupported {
            reason: format!("{decision} has fewer than two actions"),
        }
        .into()),
    }
}

/// The fraud walkthrough: prior risk, two posteriors, the decision and the
/// probability at which blocking starts to pay off.
#[derive(Serialize)]
struct DemoReport {
    prior: Posterior,
    foreign_purchase: Posterior,
    foreign_and_internet: Posterior,
    decision: DecisionResult,
    break_even: Option<BreakEven>,
}

impl TextRender for DemoReport {
    fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("1. Prior fraud risk\n");
        out.push_str(&self.prior.to_text());
        out.push_str("\n2. After a foreign purchase\n");
        out.push_str(&self.foreign_purchase.to_text());
        out.push_str("\n3. Foreign and internet purchase\n");
        out.push_str(&self.foreign_and_internet.to_text());
        out.push_str("\n4. Decision on the foreign purchase\n");
        out.push_str(&self.decision.to_text());
        if let Some(b) = &self.break_even {
            out.push_str(&format!("  {}", b.to_text()));
        }
        out
    }

    fn to_summary(&self) -> String {
        format!(
            "prior {:.4}, FP {:.4}, FP+IP {:.4}, {}",
            self.prior.probability("Fraud", "True").unwrap_or(f64::NAN),
            self.foreign_purchase
                .probability("Fraud", "True")
                .unwrap_or(f64::NAN),
            self.foreign_and_internet
                .probability("Fraud", "True")
                .unwrap_or(f64::NAN),
            self.decision.to_summary()
        )
    }
}

fn run_demo(global: &GlobalOpts, run_id: &str) -> Result<(), Error> {
    let settings = load_engine_settings(global.config.as_deref())?;
    let config = EngineConfig::from(&settings.settings);
    let spec = get_preset(PresetName::Fraud);
    let network = Network::from_spec_with_tolerance(&spec, config.normalization_tolerance)?;
    let snapshot = ConfigSnapshot::new(
        &settings.settings,
        &settings.provenance,
        PresetName::Fraud.as_str(),
        None,
    );

    let engine = VariableElimination::with_config(&network, config);
    let evaluator = DecisionEvaluator::new(&engine);
    let fp = Evidence::new().with("FP", "True");
    let fp_ip = fp.clone().with("IP", "True");

    let report = DemoReport {
        prior: engine.infer("Fraud", &Evidence::new())?,
        foreign_purchase: engine.infer("Fraud", &fp)?,
        foreign_and_internet: engine.infer("Fraud", &fp_ip)?,
        decision: evaluator.choose_action("Action", "Cost", &fp)?,
        break_even: evaluator.break_even_probability(
            "Action", "Cost", "Allow", "Block", "Fraud", "True", &fp,
        )?,
    };
    emit(global, run_id, "demo", Some(&snapshot), &report)
}

#[derive(Serialize)]
struct PresetList {
    presets: Vec<dn_config::PresetInfo>,
}

impl TextRender for PresetList {
    fn to_text(&self) -> String {
        self.presets
            .iter()
            .map(|p| format!("{:<12} {:>2} variables  {}\n", p.name, p.variables, p.description))
            .collect()
    }

    fn to_summary(&self) -> String {
        self.presets
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn run_presets(global: &GlobalOpts, run_id: &str) -> Result<(), Error> {
    let list = PresetList {
        presets: list_presets(),
    };
    emit::<PresetList>(global, run_id, "presets", None, &list)
}
