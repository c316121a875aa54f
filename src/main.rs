use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use screen_graph::agent::{ActionAgent, CoordinateMode, ScriptedBackend};
use screen_graph::config::{self, parse_screen_size};
use screen_graph::device::MockDeviceConfig;
use screen_graph::render::write_placeholders;
use screen_graph::runner::TestRunner;
use screen_graph::scenario;
use screen_graph::suite::{RESPONSES_FILE, SuiteOptions, SuiteOutcome, run_suite};

/// Screen Graph - device-free scenario runner for GUI automation agents
#[derive(Parser, Debug)]
#[command(
    name = "screen-graph",
    about = "Device-free state-graph harness for exercising GUI automation agents",
    after_help = "ENVIRONMENT VARIABLES:\n\
        SCREEN_GRAPH_SCENARIO_DIR  Directory searched by `suite`\n\
        SCREEN_GRAPH_SCREEN_SIZE   Screen size as WxH\n\
        SCREEN_GRAPH_DEVICE_ID     Mock device id\n\
        SCREEN_GRAPH_KEYBOARD      Mock keyboard IME\n\
        SCREEN_GRAPH_LOG           Log filter (falls back to RUST_LOG)"
)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a scenario and report every validation problem
    Validate {
        /// Scenario files to check
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,
    },

    /// Run one scenario against scripted model replies
    Run {
        /// Scenario file
        scenario: PathBuf,

        /// YAML/JSON list of model replies (default: responses.yaml beside the scenario)
        #[arg(short, long)]
        responses: Option<PathBuf>,

        /// Treat reply coordinates as a 0..1000 grid over the screen size
        #[arg(long)]
        relative: bool,

        /// Screen size for --relative, as WxH (default: SCREEN_GRAPH_SCREEN_SIZE)
        #[arg(long, short = 's')]
        size: Option<String>,

        /// Load the current screenshot into every prompt
        #[arg(long)]
        capture: bool,

        /// Print the verdict, hit history and device calls as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run every scenario.yaml (with its responses.yaml) under a directory
    Suite {
        /// Directory to search (default: SCREEN_GRAPH_SCENARIO_DIR)
        dir: Option<PathBuf>,

        #[arg(long)]
        relative: bool,

        #[arg(long, short = 's')]
        size: Option<String>,

        #[arg(long)]
        capture: bool,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write placeholder images for a scenario's missing screenshots
    Placeholders {
        scenario: PathBuf,

        /// Image size as WxH (default: SCREEN_GRAPH_SCREEN_SIZE)
        #[arg(long, short = 's')]
        size: Option<String>,

        /// Replace screenshots that already exist
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config::get().log_filter))
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns whether everything checked/run passed
fn run(args: Args) -> Result<bool, Box<dyn Error>> {
    match args.command {
        Commands::Validate { scenarios } => {
            let mut all_ok = true;
            for path in scenarios {
                match scenario::load_file(&path) {
                    Ok(def) => {
                        let terminals: Vec<&str> =
                            def.terminal_states().map(|s| s.id.as_str()).collect();
                        println!(
                            "ok    {} ({} states, start '{}', terminal {}, max_steps {})",
                            path.display(),
                            def.states.len(),
                            def.start,
                            terminals.join(", "),
                            def.max_steps
                        );
                    }
                    Err(e) => {
                        all_ok = false;
                        println!("error {}\n{}", path.display(), e);
                    }
                }
            }
            Ok(all_ok)
        }

        Commands::Run {
            scenario,
            responses,
            relative,
            size,
            capture,
            json,
        } => {
            let coordinates = coordinate_mode(relative, size.as_deref())?;
            let runner = TestRunner::from_path(&scenario)?;
            let responses = responses.unwrap_or_else(|| scenario.with_file_name(RESPONSES_FILE));
            let backend = ScriptedBackend::from_file(&responses)?;
            let mut agent = ActionAgent::new(backend)
                .coordinates(coordinates)
                .capture_screenshots(capture);

            let trace = runner.run_traced(&mut agent)?;
            let verdict = &trace.verdict;

            if json {
                println!("{}", serde_json::to_string_pretty(&trace)?);
            } else {
                let status = if verdict.passed { "PASS" } else { "FAIL" };
                println!("{} {}", status, verdict.test_name);
                println!("  final state: {}", verdict.final_state);
                println!("  steps: {} (misses: {})", verdict.steps_taken, verdict.misses);
                if let Some(reason) = &verdict.failure_reason {
                    println!("  reason: {}", reason);
                }
                let backend = agent.backend();
                println!(
                    "  replies: {} used, {} unused",
                    backend.consumed(),
                    backend.remaining()
                );
                if let Some(note) = &trace.termination_note {
                    println!("  agent stopped: {}", note);
                }
                for hit in &trace.history {
                    let to = hit.to.as_deref().unwrap_or("(miss)");
                    println!("  #{} ({}, {}) {} -> {}", hit.seq, hit.x, hit.y, hit.from, to);
                }
            }
            Ok(verdict.passed)
        }

        Commands::Suite {
            dir,
            relative,
            size,
            capture,
            json,
        } => {
            let dir = dir.unwrap_or_else(|| PathBuf::from(config::scenario_dir()));
            let options = SuiteOptions {
                coordinates: coordinate_mode(relative, size.as_deref())?,
                capture_screenshots: capture,
                device: MockDeviceConfig::default(),
            };
            let report = run_suite(&dir, &options);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for entry in &report.entries {
                    match &entry.outcome {
                        SuiteOutcome::Verdict(v) if v.passed => {
                            println!("PASS  {}", entry.scenario.display())
                        }
                        SuiteOutcome::Verdict(v) => println!(
                            "FAIL  {}: {}",
                            entry.scenario.display(),
                            v.failure_reason
                                .as_ref()
                                .map(|r| r.to_string())
                                .unwrap_or_default()
                        ),
                        SuiteOutcome::Error { message } => {
                            println!("ERROR {}: {}", entry.scenario.display(), message)
                        }
                    }
                }
                println!(
                    "\n{} passed, {} failed, {} errors",
                    report.passed, report.failed, report.errors
                );
            }
            Ok(report.all_passed())
        }

        Commands::Placeholders {
            scenario,
            size,
            force,
        } => {
            let size = screen_size(size.as_deref())?;
            let def = scenario::load_file(&scenario)?;
            let written = write_placeholders(&def, size, force)?;
            for path in &written {
                println!("Created: {}", path.display());
            }
            println!("{} placeholder(s) written", written.len());
            Ok(true)
        }
    }
}

/// `--size` if given, otherwise the configured screen size
fn screen_size(size: Option<&str>) -> Result<(u32, u32), Box<dyn Error>> {
    match size {
        Some(size) => parse_screen_size(size).ok_or_else(|| {
            format!("Invalid screen size '{}'. Use WxH, e.g. 1080x2400", size).into()
        }),
        None => Ok(config::screen_size()),
    }
}

fn coordinate_mode(relative: bool, size: Option<&str>) -> Result<CoordinateMode, Box<dyn Error>> {
    if !relative {
        return Ok(CoordinateMode::Absolute);
    }
    let (width, height) = screen_size(size)?;
    Ok(CoordinateMode::Relative { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_falls_back_to_config() {
        assert_eq!(screen_size(None).unwrap(), config::screen_size());
        assert_eq!(screen_size(Some("720x1600")).unwrap(), (720, 1600));
        assert!(screen_size(Some("wide")).is_err());
    }

    #[test]
    fn test_relative_mode_uses_size() {
        assert_eq!(
            coordinate_mode(true, Some("1000x2000")).unwrap(),
            CoordinateMode::Relative {
                width: 1000,
                height: 2000
            }
        );
        assert_eq!(coordinate_mode(false, Some("bad")).unwrap(), CoordinateMode::Absolute);
    }
}
