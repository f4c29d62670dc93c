use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use clap::Parser;
use log::warn;

use xenoc::bridge::Bridge;
use xenoc::runtime::Runtime;
use xenoc::{info, logger};

use xeno_vm::{InputQueue, NullPins, StdoutSink, TextSink};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "xenoc", about = "Xeno language compiler and virtual machine host")]
struct Args {
    /// Turn on verbose logging. Repeat to increase verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Sets the logging to write to a file.
    #[arg(short, long)]
    log_file: Option<PathBuf>,

    /// Selects the subcommand; defaults to serving the stdio bridge.
    #[command(subcommand)]
    action: Option<Action>,
}

#[derive(clap::Subcommand, Debug)]
enum Action {
    /// Serves the line-oriented command protocol on standard input.
    Serve,
    /// Compiles and runs a Xeno source file.
    Run {
        /// Path to the source file.
        file: PathBuf,
    },
    /// Prints the version number of the host.
    Version,
}

fn main() -> Result<(), String> {
    let args = Args::parse();

    logger::configure(args.verbose, args.log_file)?;

    match args.action.unwrap_or(Action::Serve) {
        Action::Serve => serve(),
        Action::Run { file } => run_file(&file),
        Action::Version => {
            println!("xenoc version {VERSION}");
            Ok(())
        }
    }
}

fn serve() -> Result<(), String> {
    if let Err(e) = info::write_info_file(Path::new(".")) {
        warn!("Unable to write {}: {e}", info::INFO_FILE_NAME);
    }

    let sink: Arc<dyn TextSink> = Arc::new(StdoutSink::new());
    let input = Arc::new(InputQueue::new());
    let engine = Arc::new(Mutex::new(Runtime::new(
        Arc::clone(&sink),
        Arc::new(NullPins::new()),
        Arc::clone(&input),
    )));

    // SIGINT stops a running program instead of killing the process
    // mid-instruction.
    let stop = engine
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .stop_handle();
    ctrlc::set_handler(move || stop.request_stop())
        .map_err(|e| format!("Failed to set signal handler: {e}"))?;

    let mut bridge = Bridge::new(std::io::stdin().lock(), engine, sink, input);
    bridge.serve();
    Ok(())
}

fn run_file(file: &Path) -> Result<(), String> {
    let source = std::fs::read_to_string(file)
        .map_err(|e| format!("Unable to open {}: {}", file.display(), e))?;

    let sink: Arc<dyn TextSink> = Arc::new(StdoutSink::new());
    let input = Arc::new(InputQueue::new());
    let mut engine = Runtime::new(sink, Arc::new(NullPins::new()), input);

    if engine.compile_and_run(&source, true) {
        Ok(())
    } else {
        Err(String::from("Execution failed"))
    }
}
