/*
 * myspin.rs - A handy program for testing the shell
 *
 * usage: myspin <n> [status]
 * Sleeps for <n> seconds in 1-second chunks, then exits with <status> (default 0).
 */

use std::env;
use std::process;
use std::thread;
use std::time::Duration;

fn parse_arg(arg: &str, what: &str) -> u64 {
    arg.parse::<u64>().unwrap_or_else(|_| {
        eprintln!("Error: <{}> must be a non-negative integer", what);
        process::exit(1);
    })
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <n> [status]", args[0]);
        process::exit(0);
    }

    let secs = parse_arg(&args[1], "n");
    let status = args.get(2).map(|s| parse_arg(s, "status")).unwrap_or(0);

    for _ in 0..secs {
        thread::sleep(Duration::from_secs(1));
    }

    process::exit((status & 0xff) as i32);
}
