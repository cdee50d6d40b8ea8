use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use retrace_core::{init_tracing_with, OutputFormat, TraceConfig, CALL_DEPTH_LIMIT};
use retrace_repl::repl::{LineProcessResult, MultiLineCollector, Repl};
use tracing::info;

fn main() -> Result<()> {
    // Parse command line arguments
    let matches = Command::new("retrace")
        .version(retrace_core::VERSION)
        .about("Live statement-level tracing for script functions")
        .arg(
            Arg::new("file")
                .value_name("FILE")
                .help("Run a script file on startup")
                .index(1),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file; flags override its values"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Write trace lines as JSON arrays")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("surface")
                .long("surface")
                .value_name("NAME")
                .help("Global name of the tracing builtin"),
        )
        .arg(
            Arg::new("max-depth")
                .long("max-depth")
                .value_name("N")
                .value_parser(clap::value_parser!(u64).range(1..=CALL_DEPTH_LIMIT as u64))
                .help("Maximum script call depth"),
        )
        .arg(
            Arg::new("dump")
                .long("dump")
                .help("Log the instrumented body before each replay")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let debug = matches.get_flag("debug");
    init_tracing_with(if debug {
        "retrace_core=debug"
    } else {
        "retrace_core=info"
    });

    let config = build_config(&matches)?;
    info!("Starting with {:?}", config);

    let is_interactive = io::stdin().is_terminal();
    if is_interactive {
        println!("Retrace REPL v{}", retrace_core::VERSION);
        println!("Type .help for help, .quit to exit");
        println!();
    }

    let mut repl = Repl::with_config(config);

    if let Some(file) = matches.get_one::<String>("file") {
        match repl.runtime().load_file(file) {
            Ok(_) => info!("Loaded {}", file),
            Err(e) => repl.notifier().on_error(&format!("Error: {e:#}")),
        }
    }

    run_repl(&mut repl, is_interactive)
}

/// Start from the config file (if any), then apply command line flags
fn build_config(matches: &ArgMatches) -> Result<TraceConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => TraceConfig::from_json_file(path)
            .with_context(|| format!("Invalid configuration in {path}"))?,
        None => TraceConfig::default(),
    };
    if matches.get_flag("json") {
        config.output = OutputFormat::Json;
    }
    if matches.get_flag("dump") {
        config.dump_instrumented = true;
    }
    if let Some(surface) = matches.get_one::<String>("surface") {
        config.surface_name = surface.clone();
    }
    if let Some(depth) = matches.get_one::<u64>("max-depth") {
        config.max_call_depth = usize::try_from(*depth)?;
    }
    Ok(config)
}

fn run_repl(repl: &mut Repl, is_interactive: bool) -> Result<()> {
    use rustyline::{error::ReadlineError, DefaultEditor};

    let mut rl = DefaultEditor::new()?;
    let mut multiline = MultiLineCollector::new();

    while repl.is_running() {
        match rl.readline(multiline.get_prompt()) {
            Ok(line) => {
                let trimmed = line.trim();

                if trimmed.is_empty() && !multiline.is_collecting() {
                    continue;
                }

                // Check if it's a REPL command
                if trimmed.starts_with('.') && !multiline.is_collecting() {
                    rl.add_history_entry(trimmed)?;
                    if !is_interactive {
                        println!(">> {trimmed}");
                    }
                    match repl
                        .parse_input(trimmed)
                        .and_then(|command| repl.handle_command(command))
                    {
                        Ok(output) => repl.notifier().on_output(&output),
                        Err(e) => repl.notifier().on_error(&format!("Error: {e:#}")),
                    }
                    continue;
                }

                match multiline.process_line(&line) {
                    LineProcessResult::Complete(code) => {
                        rl.add_history_entry(&code)?;

                        // Echo input in non-interactive mode
                        if !is_interactive {
                            println!(">> {code}");
                        }

                        match repl.execute(&code) {
                            Ok((output, duration)) => {
                                repl.notifier().on_result(&output, duration, repl.is_quiet());
                            }
                            Err(e) => repl.notifier().on_error(&format!("Error: {e:#}")),
                        }
                    }
                    LineProcessResult::NeedMore => {}
                }
            }
            Err(ReadlineError::Interrupted) => {
                if multiline.is_collecting() {
                    println!("^C");
                    multiline.reset();
                } else {
                    println!("Use .quit to exit");
                }
            }
            Err(ReadlineError::Eof) => {
                if is_interactive {
                    println!("Goodbye!");
                }
                break;
            }
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }

    if is_interactive {
        repl.show_exit_stats();
    }

    Ok(())
}
