//! Binary entry point for the faro shipping-priority CLI.
#![forbid(unsafe_code)]

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use faro::cli::config::{load_profile, Profile};
use faro::cli::output::{render_csv, render_explain, render_json, render_text};
use faro::cli::CliError;
use faro::datagen::{DataGenerator, GeneratorConfig};
use faro::query::{QueryParams, DEFAULT_CUTOFF, DEFAULT_SEGMENT};
use faro::record::Tables;
use faro::Engine;

#[derive(Parser, Debug)]
#[command(
    name = "faro",
    version,
    about = "Shipping-priority revenue report over CSV order data",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "Increase log verbosity (-v info, -vv debug)"
    )]
    verbose: u8,

    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "FARO_CONFIG",
        help = "Optional faro.toml profile with table paths and defaults"
    )]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct TableArgs {
    #[arg(long, value_name = "FILE", help = "Customer CSV file")]
    customer: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Orders CSV file")]
    orders: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Lineitem CSV file")]
    lineitem: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ParamArgs {
    #[arg(
        long,
        value_name = "SEGMENT",
        help = "Market segment customers must belong to"
    )]
    segment: Option<String>,

    #[arg(
        long,
        value_name = "YYYY-MM-DD",
        help = "Cutoff date: orders placed before it, shipments after it"
    )]
    date: Option<String>,
}

#[derive(Args, Debug)]
struct RunCmd {
    #[command(flatten)]
    tables: TableArgs,

    #[command(flatten)]
    params: ParamArgs,

    #[arg(
        long,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Result format"
    )]
    format: OutputFormat,

    #[arg(
        long,
        value_name = "FILE",
        help = "Write results to a file instead of stdout"
    )]
    output: Option<PathBuf>,

    #[arg(long, value_name = "N", help = "Print at most N result rows")]
    limit: Option<usize>,

    #[arg(long, help = "Also print the plan tree before the results")]
    explain: bool,
}

#[derive(Args, Debug)]
struct ExplainCmd {
    #[command(flatten)]
    tables: TableArgs,

    #[command(flatten)]
    params: ParamArgs,
}

#[derive(Args, Debug)]
struct GenCmd {
    #[arg(long, value_name = "DIR", help = "Directory for the generated CSV files")]
    out: PathBuf,

    #[arg(
        long,
        value_name = "FACTOR",
        default_value_t = 1.0,
        help = "Volume scale; 1.0 is one thousand customers"
    )]
    scale: f64,

    #[arg(long, value_name = "N", default_value_t = 42, help = "Generator seed")]
    seed: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Execute the shipping-priority query and print the result")]
    Run(RunCmd),

    #[command(about = "Print the physical plan without executing it")]
    Explain(ExplainCmd),

    #[command(about = "Generate deterministic sample CSV data")]
    Gen(GenCmd),

    #[command(about = "Emit shell completions on stdout")]
    Completions {
        #[arg(value_enum, value_name = "SHELL")]
        shell: Shell,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = run(cli) {
        match &err {
            CliError::Engine(engine_err) => {
                eprintln!("error[{}]: {engine_err}", engine_err.code());
            }
            other => eprintln!("error: {other}"),
        }
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let profile = match &cli.config {
        Some(path) => load_profile(path)?,
        None => Profile::default(),
    };

    match cli.command {
        Command::Run(cmd) => run_query(cmd, &profile),
        Command::Explain(cmd) => run_explain(cmd, &profile),
        Command::Gen(cmd) => run_gen(cmd),
        Command::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "faro", &mut io::stdout());
            Ok(())
        }
    }
}

fn run_query(cmd: RunCmd, profile: &Profile) -> Result<(), CliError> {
    let tables = resolve_tables(&cmd.tables, profile)?;
    let params = resolve_params(&cmd.params, profile)?;
    let engine = Engine::new(tables);

    if cmd.explain {
        let explain = engine.explain(&params)?;
        println!("{}", render_explain(&explain, false));
        println!();
    }

    let output = engine.shipping_priority(&params)?;
    let shown = match cmd.limit {
        Some(limit) => &output.rows[..limit.min(output.rows.len())],
        None => &output.rows[..],
    };

    let mut rendered = match cmd.format {
        OutputFormat::Text => render_text(shown),
        OutputFormat::Json => render_json(shown)?,
        OutputFormat::Csv => render_csv(shown)?,
    };
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }

    match &cmd.output {
        Some(path) => {
            fs::write(path, rendered)?;
            println!("wrote {} row(s) to {}", shown.len(), path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn run_explain(cmd: ExplainCmd, profile: &Profile) -> Result<(), CliError> {
    let tables = resolve_tables(&cmd.tables, profile)?;
    let params = resolve_params(&cmd.params, profile)?;
    let explain = Engine::new(tables).explain(&params)?;
    println!("{}", render_explain(&explain, false));
    Ok(())
}

fn run_gen(cmd: GenCmd) -> Result<(), CliError> {
    if cmd.scale <= 0.0 {
        return Err(CliError::Message(format!(
            "--scale must be positive, got {}",
            cmd.scale
        )));
    }
    let config = GeneratorConfig::scaled(cmd.scale, cmd.seed);

    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar.set_message(format!(
        "generating scale {:.2} data (seed {})",
        cmd.scale, cmd.seed
    ));

    let data = DataGenerator::new(config).generate();
    bar.set_message(format!("writing CSV files to {}", cmd.out.display()));
    data.write_csv(&cmd.out)?;
    bar.finish_and_clear();

    println!(
        "wrote {} customers, {} orders, {} line items to {}",
        data.customers.len(),
        data.orders.len(),
        data.lineitems.len(),
        cmd.out.display()
    );
    Ok(())
}

fn resolve_tables(flags: &TableArgs, profile: &Profile) -> Result<Tables, CliError> {
    let customer = pick_path("customer", &flags.customer, &profile.tables.customer)?;
    let orders = pick_path("orders", &flags.orders, &profile.tables.orders)?;
    let lineitem = pick_path("lineitem", &flags.lineitem, &profile.tables.lineitem)?;
    Ok(Tables::from_paths(customer, orders, lineitem)?)
}

fn pick_path(
    name: &str,
    flag: &Option<PathBuf>,
    fallback: &Option<PathBuf>,
) -> Result<PathBuf, CliError> {
    flag.clone().or_else(|| fallback.clone()).ok_or_else(|| {
        CliError::Message(format!(
            "no {name} table given; pass --{name} or set [tables].{name} in the profile"
        ))
    })
}

fn resolve_params(flags: &ParamArgs, profile: &Profile) -> Result<QueryParams, CliError> {
    let segment = flags
        .segment
        .clone()
        .or_else(|| profile.query.segment.clone())
        .unwrap_or_else(|| DEFAULT_SEGMENT.to_owned());
    let cutoff = flags.date.clone().or_else(|| profile.query.cutoff.clone());
    Ok(match cutoff {
        Some(raw) => QueryParams::parse(segment, &raw)?,
        None => QueryParams::new(segment, DEFAULT_CUTOFF),
    })
}
