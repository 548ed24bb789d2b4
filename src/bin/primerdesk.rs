use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use primerdesk::{
    about,
    design::{evaluate, run_design, DesignOutcome},
    diagnostics::classify,
    parameters::DesignParameters,
    primer3_input::write_input_file,
    primer3_runner::{parse_timeout_secs, Primer3Runner},
    report_export::{save_binding_maps, save_report, ReportFormat},
    session::{DesignSession, DEFAULT_STATE_PATH},
    task::RoleInput,
};
use serde::Serialize;
use std::{fs, path::PathBuf};

#[derive(Parser)]
#[command(name = "primerdesk")]
#[command(about = "Primer and probe design front-end for Primer3", long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Print version and build number
    #[arg(short = 'V', long)]
    version: bool,

    /// Session state file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_STATE_PATH, global = true)]
    state: String,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct ParameterArgs {
    /// Saved Primer3 input file to start from
    #[arg(long, value_name = "FILE")]
    params: Option<PathBuf>,

    /// Override one option by its Primer3 key (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Template, may carry [target] and <excluded> markers
    #[arg(long, value_name = "SEQ", conflicts_with = "template_file")]
    template: Option<String>,

    /// Read the template from a file
    #[arg(long, value_name = "FILE")]
    template_file: Option<PathBuf>,

    #[arg(long)]
    pick_left: bool,

    #[arg(long)]
    pick_right: bool,

    #[arg(long)]
    pick_probe: bool,

    /// Supplied left primer
    #[arg(long, value_name = "SEQ")]
    left: Option<String>,

    /// Supplied right primer
    #[arg(long, value_name = "SEQ")]
    right: Option<String>,

    /// Supplied internal oligo
    #[arg(long, value_name = "SEQ")]
    probe: Option<String>,
}

#[derive(Args)]
struct OutputArgs {
    #[arg(long, value_name = "FILE")]
    html: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// Write one binding-site map per result into this directory
    #[arg(long, value_name = "DIR")]
    svg_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run Primer3 and print the report
    Design {
        #[command(flatten)]
        parameters: ParameterArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Primer3 executable (default: $PRIMERDESK_PRIMER3_BIN or primer3_core)
        #[arg(long, value_name = "PATH")]
        primer3: Option<String>,

        /// Kill the engine after SECS seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<String>,

        /// Also keep a copy of the engine input
        #[arg(long, value_name = "FILE")]
        save_input: Option<PathBuf>,
    },

    /// Write the Primer3 input file without running the engine
    Input {
        #[command(flatten)]
        parameters: ParameterArgs,

        #[arg(value_name = "OUT")]
        out: PathBuf,
    },

    /// Decode a captured Primer3 output against the parameters
    Decode {
        #[command(flatten)]
        parameters: ParameterArgs,

        #[command(flatten)]
        output: OutputArgs,

        #[arg(value_name = "RAW")]
        raw: PathBuf,
    },

    /// Print diagnostics without running; exits 1 on a blocking error
    Check {
        #[command(flatten)]
        parameters: ParameterArgs,
    },

    /// Re-render the last run stored in the session
    Report {
        #[command(flatten)]
        output: OutputArgs,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Could not serialize JSON output")?;
    println!("{text}");
    Ok(())
}

fn apply_role(input: &mut RoleInput, pick: bool, sequence: &Option<String>) {
    if pick {
        input.pick = true;
    }
    if let Some(seq) = sequence {
        input.sequence = seq.trim().to_string();
    }
}

/// Session parameters (or a saved input file), then `--set`, then flags.
fn assemble(session: &DesignSession, args: &ParameterArgs) -> Result<DesignParameters> {
    let mut params = match &args.params {
        Some(path) => DesignParameters::load_saved(path)?,
        None => session.parameters.clone(),
    };

    for item in &args.overrides {
        let Some((key, value)) = item.split_once('=') else {
            bail!("Expected KEY=VALUE, got '{item}'");
        };
        if !params.apply(key, value)? {
            bail!("'{}' is not a Primer3 option primerdesk knows", key.trim());
        }
    }

    let raw_template = match (&args.template, &args.template_file) {
        (Some(text), _) => Some(text.clone()),
        (None, Some(path)) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("Could not read template '{}'", path.display()))?,
        ),
        (None, None) => None,
    };
    if let Some(raw) = raw_template {
        params = params.with_template(&raw)?;
    }

    apply_role(&mut params.roles.left, args.pick_left, &args.left);
    apply_role(&mut params.roles.right, args.pick_right, &args.right);
    apply_role(&mut params.roles.probe, args.pick_probe, &args.probe);
    Ok(params)
}

fn write_outputs(outcome: &DesignOutcome, output: &OutputArgs) -> Result<()> {
    print!("{}", outcome.report.to_text());
    for (path, format) in [
        (&output.html, ReportFormat::Html),
        (&output.json, ReportFormat::Json),
        (&output.csv, ReportFormat::Csv),
    ] {
        if let Some(path) = path {
            save_report(&outcome.report, format, path)?;
            eprintln!("Wrote {}", path.display());
        }
    }
    if let Some(dir) = &output.svg_dir {
        for path in save_binding_maps(&outcome.report, dir)? {
            eprintln!("Wrote {path}");
        }
    }
    for notice in &outcome.notices {
        eprintln!("{notice}");
    }
    Ok(())
}

fn load_session(path: &str) -> Result<DesignSession> {
    Ok(DesignSession::load_or_default(path)?)
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("{}", about::version_cli_text());
        return Ok(());
    }
    init_logging(cli.verbose);

    let Some(command) = cli.command else {
        bail!("Missing command, see --help");
    };
    let state_path = cli.state;

    match command {
        Commands::Design {
            parameters,
            output,
            primer3,
            timeout,
            save_input,
        } => {
            let mut session = load_session(&state_path)?;
            let params = assemble(&session, &parameters)?;
            let timeout = match timeout {
                Some(text) => Some(
                    parse_timeout_secs(&text)
                        .with_context(|| format!("Invalid timeout '{text}'"))?,
                ),
                None => None,
            };
            let runner = Primer3Runner::from_env(primer3.as_deref(), timeout);
            let outcome = run_design(&params, &runner, save_input.as_deref())?;
            write_outputs(&outcome, &output)?;

            match &outcome.raw_output {
                Some(raw) => session.record_run(&params, runner.executable(), raw),
                None => session.parameters = params,
            }
            if let Err(e) = session.save_to_path(&state_path) {
                log::warn!("{e}");
                eprintln!("{e}");
            }
            if let Some(e) = outcome.engine_error() {
                bail!(e);
            }
            Ok(())
        }
        Commands::Input { parameters, out } => {
            let session = load_session(&state_path)?;
            let params = assemble(&session, &parameters)?;
            write_input_file(&params, &out)?;
            println!("Wrote Primer3 input to '{}'", out.display());
            Ok(())
        }
        Commands::Decode {
            parameters,
            output,
            raw,
        } => {
            let session = load_session(&state_path)?;
            let params = assemble(&session, &parameters)?;
            let text = fs::read_to_string(&raw)
                .with_context(|| format!("Could not read engine output '{}'", raw.display()))?;
            let outcome = evaluate(&params, &text)?;
            write_outputs(&outcome, &output)
        }
        Commands::Check { parameters } => {
            let session = load_session(&state_path)?;
            let params = assemble(&session, &parameters)?;
            let diagnostics = classify(&params, None);
            print_json(&diagnostics)?;
            if diagnostics.is_blocking() {
                bail!("Design is blocked: {}", diagnostics.triage.as_str());
            }
            Ok(())
        }
        Commands::Report { output } => {
            let session = load_session(&state_path)?;
            let Some(raw) = &session.last_output else {
                bail!("No previous run in '{state_path}'");
            };
            let outcome = evaluate(&session.parameters, raw)?;
            write_outputs(&outcome, &output)
        }
    }
}
