use signal_hook::{consts::signal::SIGQUIT, iterator::Signals};
use std::io;
use std::thread;

/// Installs the shell's only signal handler: SIGQUIT prints a termination
/// message and exits. Every other signal keeps its default disposition.
pub fn install_signal_handlers() -> io::Result<()> {
    let mut signals = Signals::new([SIGQUIT])?;
    thread::spawn(move || {
        if signals.forever().next().is_some() {
            println!("Terminating after receipt of SIGQUIT signal");
            std::process::exit(0);
        }
    });
    Ok(())
}
