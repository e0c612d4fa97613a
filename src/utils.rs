use once_cell::sync::OnceCell;
use std::process;

static VERBOSE: OnceCell<bool> = OnceCell::new();

/// Enables or disables verbose tracing. Only the first call has any effect.
pub fn set_verbose(enabled: bool) {
    let _ = VERBOSE.set(enabled);
}

pub fn verbose_enabled() -> bool {
    VERBOSE.get().copied().unwrap_or(false)
}

/// Prints a `mysh:`-prefixed trace line to stderr when verbose mode is on.
#[macro_export]
macro_rules! verbose {
    ($($arg:tt)*) => {
        if $crate::utils::verbose_enabled() {
            eprintln!("mysh: {}", format_args!($($arg)*));
        }
    };
}

pub fn print_usage() -> ! {
    println!("Usage: mysh [-hvp] [file]");
    println!("   -h   Print this help message");
    println!("   -v   Enable verbose mode");
    println!("   -p   Do not print a command prompt");
    println!("   file Read command lines from file instead of standard input");
    process::exit(1);
}
