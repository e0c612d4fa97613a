mod builtins;
mod error;
mod exec;
mod jobs;
mod parser;
mod shell;
mod signals;
mod utils;

use shell::Config;
use std::env;
use std::process;

fn main() {
    // Parse command-line arguments.
    let args: Vec<String> = env::args().collect();
    let mut config = Config::default();
    let mut files = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-h" => utils::print_usage(),
            "-v" => config.verbose = true,
            "-p" => config.emit_prompt = false,
            _ => files.push(arg.clone()),
        }
    }
    // Only a single file argument redirects input; with more, stdin is read.
    if files.len() == 1 {
        config.input = files.pop();
    }
    utils::set_verbose(config.verbose);

    // Read lines from the given file instead of the terminal.
    if let Some(path) = &config.input {
        if let Err(err) = shell::redirect_input(path) {
            eprintln!("{}", err);
            process::exit(err.exit_status());
        }
    }

    if let Err(err) = signals::install_signal_handlers() {
        eprintln!("mysh: unable to install signal handlers: {}", err);
    }

    process::exit(shell::run_shell(&config));
}
