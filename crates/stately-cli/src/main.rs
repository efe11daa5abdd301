use clap::{ArgAction, Parser as ClapParser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr, bail};
use serde::Serialize;
use stately::{
    Config, FixedInputs, IssueKind, Machine, MachineStatus, NameLookup, Severity, Simulator,
    check_names, emit,
};
use std::fs;
use std::path::{Path, PathBuf};

mod logger;

#[derive(ClapParser)]
#[command(
    name = "stately",
    about = "Check, simulate and generate FL from finite-state machine files"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log more (repeat for more detail)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a machine and list its issues
    Check {
        file: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate FL for a machine
    Emit {
        file: PathBuf,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Step a machine from its initial state
    Simulate {
        file: PathBuf,
        /// Input values for one step, e.g. `go=1,reset=0`; unnamed inputs are low
        #[arg(long = "step", value_parser = parse_inputs)]
        steps: Vec<FixedInputs>,
        /// Print a waveform of the run
        #[arg(long)]
        waveform: bool,
        /// Write the run as a Value Change Dump
        #[arg(long)]
        vcd: Option<PathBuf>,
    },
    /// Print a machine as transform commands
    Export { file: PathBuf },
    /// Build a machine from transform commands
    Import {
        commands: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct Report {
    machine: String,
    status: MachineStatus,
    issues: Vec<IssueReport>,
}

#[derive(Serialize)]
struct IssueReport {
    kind: IssueKind,
    severity: Severity,
    message: String,
    signals: Vec<String>,
    states: Vec<String>,
}

fn parse_inputs(text: &str) -> Result<FixedInputs, String> {
    let mut inputs = FixedInputs::new();
    for item in text.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        let Some((name, value)) = item.split_once('=') else {
            return Err(format!("expected name=value, found `{item}`"));
        };
        let value = match value.trim() {
            "1" | "true" => true,
            "0" | "false" => false,
            other => return Err(format!("`{other}` is not 0, 1, true or false")),
        };
        inputs.set(name.trim(), value);
    }
    Ok(inputs)
}

fn load(path: &Path) -> Result<Machine> {
    let text = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Cannot read {}", path.display()))?;
    Machine::load(&text)
        .into_diagnostic()
        .wrap_err_with(|| format!("Cannot load machine from {}", path.display()))
}

fn analyzed(path: &Path) -> Result<Machine> {
    let mut machine = load(path)?;
    machine.analyze();
    Ok(machine)
}

fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, text)
            .into_diagnostic()
            .wrap_err_with(|| format!("Cannot write {}", path.display())),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn check(machine: &Machine, config: &Config, json: bool) -> Result<()> {
    let mut issues = machine.issues().to_vec();
    issues.extend(check_names(machine, &config.emit));

    if json {
        let report = Report {
            machine: machine.name().to_string(),
            status: machine.status(),
            issues: issues
                .iter()
                .map(|issue| IssueReport {
                    kind: issue.kind,
                    severity: issue.severity,
                    message: issue.message.clone(),
                    signals: issue
                        .signals
                        .iter()
                        .map(|id| machine.signal_name(*id).unwrap_or("?").to_string())
                        .collect(),
                    states: issue
                        .states
                        .iter()
                        .map(|id| machine.state_name(*id).unwrap_or("?").to_string())
                        .collect(),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
    } else {
        for issue in &issues {
            println!("{}", issue.display(machine));
        }
        println!("{}: {}", machine.name(), machine.status());
    }

    if machine.status() != MachineStatus::Happy {
        bail!("Machine \"{}\" is {}", machine.name(), machine.status());
    }
    Ok(())
}

fn simulate(
    machine: &Machine,
    config: &Config,
    steps: Vec<FixedInputs>,
    waveform: bool,
    vcd: Option<&Path>,
) -> Result<()> {
    let mut sim = Simulator::builder(machine)
        .options(config.simulator.clone())
        .build()
        .into_diagnostic()?;
    let model = sim.model().clone();
    let state_name = |id| model.state_name(id).unwrap_or("?");

    for (index, inputs) in steps.into_iter().enumerate() {
        sim.set_input_source(inputs);
        let (Some(current), Some(next)) = (sim.current_state(), sim.next_state()) else {
            bail!("Simulation stopped before step {index}");
        };
        let values = model
            .signals()
            .iter()
            .filter_map(|id| {
                sim.value(*id)
                    .map(|value| format!("{}={}", model.signal_name(*id).unwrap_or("?"), u8::from(value)))
            })
            .collect::<Vec<_>>()
            .join(" ");
        println!("{index}: {} -> {}  {values}", state_name(current), state_name(next));
        sim.step_forward();
    }

    if waveform {
        print!("{}", sim.waveform());
    }
    if let Some(path) = vcd {
        let file = fs::File::create(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Cannot create {}", path.display()))?;
        sim.write_vcd(file).into_diagnostic()?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load(path).into_diagnostic()?,
        None => Config::default(),
    };

    match cli.command {
        Command::Check { file, json } => check(&analyzed(&file)?, &config, json),
        Command::Emit { file, output } => {
            let text = emit(&analyzed(&file)?, &config.emit).into_diagnostic()?;
            write_output(output.as_deref(), &text)
        }
        Command::Simulate {
            file,
            steps,
            waveform,
            vcd,
        } => simulate(&analyzed(&file)?, &config, steps, waveform, vcd.as_deref()),
        Command::Export { file } => {
            let machine = load(&file)?;
            let text: String = machine
                .export_commands(None)
                .iter()
                .map(|command| format!("{command}\n"))
                .collect();
            write_output(None, &text)
        }
        Command::Import { commands, output } => {
            let source = fs::read_to_string(&commands)
                .into_diagnostic()
                .wrap_err_with(|| format!("Cannot read {}", commands.display()))?;
            let machine = Machine::new("untitled")
                .import_commands(&source)
                .into_diagnostic()?;
            write_output(Some(&output), &machine.save())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inputs() {
        let inputs = parse_inputs("go=1, reset = false,,").unwrap();
        assert_eq!(inputs.get("go"), Some(true));
        assert_eq!(inputs.get("reset"), Some(false));
        assert_eq!(inputs.get("busy"), None);
        assert!(parse_inputs("go").is_err());
        assert!(parse_inputs("go=2").is_err());
    }

    #[test]
    fn test_load_round_trip_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("m.stately");
        let mut machine = Machine::new("m");
        machine.add_state("A");
        write_output(Some(&good), &machine.save()).unwrap();
        assert_eq!(load(&good).unwrap().states().len(), 1);

        let bad = dir.path().join("bad.stately");
        fs::write(&bad, "(1)").unwrap();
        let err = load(&bad).unwrap_err();
        assert!(err.to_string().starts_with("Cannot load machine from"));
        assert!(load(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
