use crate::error::ShellError;
use crate::exec::{Dispatcher, Flow, Host, UnixHost};
use crate::parser::RawLine;
use nix::fcntl::{open, OFlag};
use nix::libc::STDIN_FILENO;
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2, isatty};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

/// Prompt printed before every line read.
pub static PROMPT: &str = "$ ";

const HISTORY_FILE: &str = ".mysh_history";

/// Startup options taken from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Print [`PROMPT`] before each read.
    pub emit_prompt: bool,
    /// Trace dispatch decisions on stderr.
    pub verbose: bool,
    /// File to read command lines from instead of the terminal.
    pub input: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            emit_prompt: true,
            verbose: false,
            input: None,
        }
    }
}

/// Makes `path` the process's standard input, for the shell and every child
/// it starts.
pub fn redirect_input(path: &str) -> Result<(), ShellError> {
    let fd = open(path, OFlag::O_RDONLY, Mode::empty()).map_err(|source| ShellError::Open {
        path: path.to_string(),
        source,
    })?;
    if fd != STDIN_FILENO {
        dup2(fd, STDIN_FILENO).map_err(ShellError::Redirect)?;
        let _ = close(fd);
    }
    Ok(())
}

/// A source of command lines.
pub trait ReadLine {
    /// Reads the next line as raw bytes, terminator included when there is
    /// one. Returns `Ok(None)` at end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<Vec<u8>>, ShellError>;
}

/// Where command lines come from: a line editor on a terminal, plain
/// standard input otherwise.
enum LineSource {
    Editor {
        editor: DefaultEditor,
        history: Option<PathBuf>,
    },
    Stream(io::StdinLock<'static>),
}

impl LineSource {
    fn open() -> Self {
        if isatty(STDIN_FILENO).unwrap_or(false) {
            match DefaultEditor::new() {
                Ok(mut editor) => {
                    let history = dirs_next::home_dir().map(|home| home.join(HISTORY_FILE));
                    if let Some(path) = &history {
                        // A missing history file is normal on first start.
                        let _ = editor.load_history(path);
                    }
                    return LineSource::Editor { editor, history };
                }
                Err(err) => crate::verbose!("line editor unavailable: {}", err),
            }
        }
        LineSource::Stream(io::stdin().lock())
    }

    fn close(self) {
        if let LineSource::Editor {
            mut editor,
            history: Some(path),
        } = self
        {
            if let Err(err) = editor.save_history(&path) {
                crate::verbose!("could not save history to {}: {}", path.display(), err);
            }
        }
    }
}

impl ReadLine for LineSource {
    fn read_line(&mut self, prompt: &str) -> Result<Option<Vec<u8>>, ShellError> {
        match self {
            LineSource::Stream(stdin) => {
                print!("{}", prompt);
                io::stdout().flush()?;
                let mut buf = Vec::new();
                match stdin.read_until(b'\n', &mut buf) {
                    Ok(0) => Ok(None),
                    Ok(_) => Ok(Some(buf)),
                    Err(err) => Err(ShellError::Read(err)),
                }
            }
            LineSource::Editor { editor, .. } => match editor.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = editor.add_history_entry(line.as_str());
                    }
                    Ok(Some(line.into_bytes()))
                }
                // Ctrl-C abandons the line being typed.
                Err(ReadlineError::Interrupted) => Ok(Some(Vec::new())),
                Err(ReadlineError::Eof) => Ok(None),
                Err(err) => Err(err.into()),
            },
        }
    }
}

/// How a run over a line source ended.
#[derive(Debug)]
pub enum Ended {
    /// The source ran dry; the shutdown message has been written.
    EndOfInput,
    /// The `exit` built-in ran.
    Exit,
    /// An error the interpreter cannot continue after. Already reported.
    Fatal(ShellError),
}

impl Ended {
    /// Status the process exits with.
    pub fn exit_status(&self) -> i32 {
        match self {
            Ended::EndOfInput | Ended::Exit => 0,
            Ended::Fatal(err) => err.exit_status(),
        }
    }
}

/// Reads lines from `input` and dispatches them until end of input, `exit`
/// or a fatal error.
pub fn run_lines<R, H, W>(input: &mut R, dispatcher: &mut Dispatcher<H, W>, prompt: &str) -> Ended
where
    R: ReadLine,
    H: Host,
    W: Write,
{
    loop {
        let line = match input.read_line(prompt) {
            Ok(Some(line)) => RawLine::new(line),
            Ok(None) => break,
            Err(err) => {
                eprintln!("{}", err);
                return Ended::Fatal(err);
            }
        };
        crate::verbose!("received command: {}", String::from_utf8_lossy(line.as_bytes()));

        let flow = match line.segments() {
            Ok(segments) => dispatcher.run_line(&segments),
            Err(err) => {
                eprintln!("mysh: {}", err);
                dispatcher.reap_background().map(|()| Flow::Continue)
            }
        };
        match flow {
            Ok(Flow::Continue) => {
                crate::verbose!(
                    "{} background job(s) outstanding",
                    dispatcher.background_tally()
                );
            }
            Ok(Flow::Exit) => return Ended::Exit,
            Err(err) => {
                eprintln!("mysh: {}", err);
                return Ended::Fatal(err);
            }
        }
    }

    let out = dispatcher.output();
    let _ = out.write_all(b"\nShutting down...\n");
    let _ = out.flush();
    Ended::EndOfInput
}

/// Runs the main shell loop over standard input (or the line editor).
///
/// Returns the status the process should exit with. The `exit` built-in
/// terminates the process right away, without saving history or dropping
/// the line buffers.
pub fn run_shell(config: &Config) -> i32 {
    let prompt = if config.emit_prompt { PROMPT } else { "" };
    let mut input = LineSource::open();
    let mut dispatcher = Dispatcher::new(UnixHost, io::stdout());

    match run_lines(&mut input, &mut dispatcher, prompt) {
        Ended::Exit => process::exit(0),
        Ended::EndOfInput => {
            input.close();
            0
        }
        fatal @ Ended::Fatal(_) => fatal.exit_status(),
    }
}
