use clap::Parser;
use ptm::types::RENDER_WINDOW;
use ptm::{
    analyze, Event, Fanout, MachineConfig, MachineError, Program, ProgramLoader, ProgramManager,
    RunOutcome, Snapshot, Tape, MAX_EXECUTION_STEPS,
};
use serde_json::{json, Value};
use std::io::{self, Read};
use std::path::Path;
use std::process;
use std::thread;
use std::time::Duration;

/// Runs a three-symbol tape machine program to completion.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(after_help = "EXAMPLES:
  ptm-cli programs/add_one_binary.ptm --input 111
  ptm-cli --template invert_values --debug
  cat programs/remove_one_binary.ptm | ptm-cli --slow 250 --debug")]
struct Cli {
    /// Path to a program file (.ptm).
    /// Program content can also be piped via stdin.
    program: Option<String>,

    /// Run a built-in program, by key or by name
    #[clap(short, long, conflicts_with = "program")]
    template: Option<String>,

    /// List the built-in programs and exit
    #[clap(short, long)]
    list: bool,

    /// Replace the initial tape, e.g. "1011" (b or _ for blank)
    #[clap(short, long)]
    input: Option<String>,

    /// Initial head position
    #[clap(long, allow_negative_numbers = true)]
    head: Option<i64>,

    /// Give up after this many steps
    #[clap(short, long, default_value_t = MAX_EXECUTION_STEPS, allow_negative_numbers = true)]
    max_steps: i64,

    /// Print each step of the execution
    #[clap(short = 'd', long)]
    debug: bool,

    /// Print each step as a JSON object
    #[clap(long, conflicts_with = "debug")]
    json: bool,

    /// Wait this many milliseconds between steps
    #[clap(long)]
    slow: Option<u64>,

    /// Number of steps kept for undo (unbounded by default)
    #[clap(long)]
    history_limit: Option<usize>,
}

fn main() {
    let cli = Cli::parse();

    if cli.list {
        print_programs();
        return;
    }

    let program = match load_program(&cli) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    for diagnostic in analyze(&program) {
        eprintln!("Warning: {}", diagnostic);
    }

    let config = MachineConfig {
        history_limit: cli.history_limit,
    };
    let mut machine = program.machine_with_config(config);

    if cli.debug {
        println!(
            "Program: {}, State: {}, Head: {}, Tape: {}",
            program.name,
            machine.state(),
            machine.head(),
            machine.tape()
        );
    }

    let mut observers = Fanout::new();
    if let Some(ms) = cli.slow {
        observers.push(pacer(Duration::from_millis(ms)));
    }
    if cli.debug {
        observers.push(|s: &Snapshot| println!("{}", format_snapshot(s)));
    } else if cli.json {
        observers.push(|s: &Snapshot| match serde_json::to_string(s) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("Error: {}", e),
        });
    }
    if !observers.is_empty() {
        machine.set_observer(observers);
    }

    let outcome = match machine.run(cli.max_steps) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if cli.debug {
        match outcome {
            RunOutcome::Halted { steps_taken } => {
                println!("\nMachine halted after {} steps.", steps_taken)
            }
            RunOutcome::StepLimitExceeded { steps_taken } => {
                println!("\nStep limit reached after {} steps.", steps_taken)
            }
        }
        println!("Window: {}", render_window(machine.tape()));
        println!("\nFinal tape:");
    }

    if cli.json {
        println!("{}", summary_json(&outcome, machine.tape()));
    } else {
        println!("{}", machine.tape());
    }

    if let RunOutcome::StepLimitExceeded { steps_taken } = outcome {
        eprintln!("Error: no halt within {} steps", steps_taken);
        process::exit(1);
    }
}

/// Loads a program based on CLI arguments.
///
/// It tries a built-in template, then a file path, and finally stdin.
fn load_program(cli: &Cli) -> Result<Program, MachineError> {
    let mut program = if let Some(name) = &cli.template {
        ProgramManager::get_by_name(name)?
    } else if let Some(file_path) = &cli.program {
        ProgramLoader::load_program(Path::new(file_path))?
    } else if atty::isnt(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| MachineError::FileError(format!("Failed to read from stdin: {}", e)))?;
        ProgramLoader::load_program_from_string(&buffer)?
    } else {
        return Err(MachineError::InvalidArgument(
            "No program given. Pass a file, pipe one via stdin, or use --template".to_string(),
        ));
    };

    if let Some(input) = &cli.input {
        program.set_input(input)?;
    }
    if let Some(head) = cli.head {
        program.head = head;
    }

    Ok(program)
}

/// Returns an observer that sleeps before every snapshot except the first.
///
/// Placed ahead of the printing observer, it spaces out the printed steps without a trailing
/// delay after the last one.
fn pacer(delay: Duration) -> impl FnMut(&Snapshot) {
    let mut first = true;
    move |_: &Snapshot| {
        if !std::mem::take(&mut first) {
            thread::sleep(delay);
        }
    }
}

/// The closing line of `--json` output.
fn summary_json(outcome: &RunOutcome, tape: &Tape) -> Value {
    let (halted, steps_taken) = match *outcome {
        RunOutcome::Halted { steps_taken } => (true, steps_taken),
        RunOutcome::StepLimitExceeded { steps_taken } => (false, steps_taken),
    };

    json!({
        "halted": halted,
        "steps_taken": steps_taken,
        "head": tape.position(),
        "tape": tape.to_string(),
    })
}

fn format_snapshot(snapshot: &Snapshot) -> String {
    let event = match snapshot.event {
        Event::Transition(t) => format!(
            "write {}, move {}, next {}",
            t.write, t.direction, t.next_state
        ),
        Event::Halted => "halt".to_string(),
        Event::ManualWrite(symbol) => format!("manual write {}", symbol),
        Event::ManualMove(direction) => format!("manual move {}", direction),
    };

    format!(
        "Step: {}, State: {}, Head: {}, Symbol: {}, Action: {}",
        snapshot.step_count, snapshot.state, snapshot.head, snapshot.symbol, event
    )
}

/// Renders the fixed window around position 0, with the head cell in brackets.
fn render_window(tape: &Tape) -> String {
    tape.snapshot_window(-RENDER_WINDOW, RENDER_WINDOW)
        .into_iter()
        .zip(-RENDER_WINDOW..)
        .map(|(symbol, position)| {
            if position == tape.position() {
                format!("[{}]", symbol)
            } else {
                symbol.to_string()
            }
        })
        .collect()
}

fn print_programs() {
    for index in 0..ProgramManager::count() {
        if let Ok(info) = ProgramManager::info(index) {
            println!(
                "{:<20} {} (tape: {}, {} states, {} rules)",
                info.key, info.name, info.initial_tape, info.state_count, info.transition_count
            );
        }
    }
}
