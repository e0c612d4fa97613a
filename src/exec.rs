use crate::builtins::{self, Builtin};
use crate::error::ShellError;
use crate::jobs::{JobList, Outcome};
use crate::parser::{Mode, Segment};
use nix::errno::Errno;
use nix::libc::{self, c_char};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{self, fork, ForkResult, Pid};
use std::ffi::CString;
use std::io::{self, Write};
use std::ptr;

/// The operating-system services the dispatcher needs.
pub trait Host {
    /// Starts `argv[0]`, looked up through `PATH`, with `argv` as its full
    /// argument list. `argv` is never empty.
    fn spawn(&mut self, argv: &[&[u8]]) -> Result<Pid, ShellError>;

    /// Blocks until the child `pid` terminates and returns its status code.
    fn wait(&mut self, pid: Pid) -> Result<i32, ShellError>;

    /// Returns the status code of `pid` if it has terminated, without blocking.
    fn try_wait(&mut self, pid: Pid) -> Result<Option<i32>, ShellError>;

    /// Moves the working directory one level up. Failure is ignored.
    fn change_to_parent(&mut self);
}

/// [`Host`] backed by fork, execvp and waitpid.
#[derive(Debug, Default)]
pub struct UnixHost;

impl Host for UnixHost {
    fn spawn(&mut self, argv: &[&[u8]]) -> Result<Pid, ShellError> {
        let request = ExecRequest::new(argv)?;

        // Anything still buffered would otherwise be written twice.
        io::stdout().flush()?;

        match unsafe { fork() } {
            Ok(ForkResult::Child) => request.exec(),
            Ok(ForkResult::Parent { child }) => Ok(child),
            Err(err) => Err(ShellError::Fork(err)),
        }
    }

    fn wait(&mut self, pid: Pid) -> Result<i32, ShellError> {
        loop {
            match waitpid(pid, None) {
                Ok(status) => {
                    if let Some(code) = status_code(status) {
                        return Ok(code);
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(source) => return Err(ShellError::Wait { pid, source }),
            }
        }
    }

    fn try_wait(&mut self, pid: Pid) -> Result<Option<i32>, ShellError> {
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => Ok(None),
            Ok(status) => Ok(status_code(status)),
            Err(source) => Err(ShellError::Wait { pid, source }),
        }
    }

    fn change_to_parent(&mut self) {
        let _ = unistd::chdir("..");
    }
}

/// Everything the forked child touches, built before `fork`: the child of a
/// multi-threaded process may only make async-signal-safe calls, so it must
/// not allocate.
struct ExecRequest {
    args: Vec<CString>,
    /// NUL-terminated pointer array into `args`.
    argv: Vec<*const c_char>,
    /// `mysh: <command>: ` for the exec failure message.
    prefix: Vec<u8>,
}

impl ExecRequest {
    fn new(argv: &[&[u8]]) -> Result<Self, ShellError> {
        let args = argv
            .iter()
            .map(|arg| CString::new(*arg))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ShellError::NulInArgument(String::from_utf8_lossy(argv[0]).into_owned()))?;
        let mut pointers: Vec<*const c_char> = args.iter().map(|arg| arg.as_ptr()).collect();
        pointers.push(ptr::null());

        let mut prefix = b"mysh: ".to_vec();
        prefix.extend_from_slice(argv[0]);
        prefix.extend_from_slice(b": ");

        Ok(ExecRequest {
            args,
            argv: pointers,
            prefix,
        })
    }

    /// Replaces the forked child with the requested program, or terminates
    /// it with a shell-style status if that is impossible.
    fn exec(&self) -> ! {
        unsafe {
            libc::execvp(self.args[0].as_ptr(), self.argv.as_ptr());
        }
        let (reason, code) = match Errno::last() {
            Errno::ENOENT => ("command not found", 127),
            Errno::EACCES => ("permission denied", 126),
            other => (other.desc(), 1),
        };
        write_stderr(&self.prefix);
        write_stderr(reason.as_bytes());
        write_stderr(b"\n");
        unsafe { libc::_exit(code) }
    }
}

fn write_stderr(bytes: &[u8]) {
    unsafe {
        libc::write(libc::STDERR_FILENO, bytes.as_ptr().cast(), bytes.len());
    }
}

/// Status code reported for a terminated child: the exit code for a normal
/// exit, 0 for a child killed by a signal. `None` if the child has not
/// terminated.
pub fn status_code(status: WaitStatus) -> Option<i32> {
    match status {
        WaitStatus::Exited(_, code) => Some(code),
        WaitStatus::Signaled(..) => Some(0),
        _ => None,
    }
}

/// Whether the interpreter keeps reading lines after a line was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The `exit` built-in ran; nothing after it on the line was executed.
    Exit,
}

/// Runs the segments of each line in order and keeps track of the
/// background processes they leave behind.
///
/// Reports for the operator are written to `out`; problems that do not stop
/// the interpreter go to standard error.
pub struct Dispatcher<H: Host, W: Write> {
    host: H,
    out: W,
    jobs: JobList,
}

impl<H: Host, W: Write> Dispatcher<H, W> {
    pub fn new(host: H, out: W) -> Self {
        Dispatcher {
            host,
            out,
            jobs: JobList::new(),
        }
    }

    /// Where operator reports are written.
    pub fn output(&mut self) -> &mut W {
        &mut self.out
    }

    #[cfg(test)]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Number of background processes not yet confirmed reaped.
    pub fn background_tally(&self) -> usize {
        self.jobs.tally()
    }

    /// Executes `segments` left to right, then sweeps the background jobs.
    ///
    /// Returns as soon as `exit` is seen, without sweeping. An error is only
    /// returned when the interpreter must terminate.
    pub fn run_line(&mut self, segments: &[Segment<'_>]) -> Result<Flow, ShellError> {
        for segment in segments {
            if self.dispatch(segment)? == Flow::Exit {
                return Ok(Flow::Exit);
            }
        }
        self.reap_background()?;
        Ok(Flow::Continue)
    }

    fn dispatch(&mut self, segment: &Segment<'_>) -> Result<Flow, ShellError> {
        if segment.is_empty() {
            return Ok(Flow::Continue);
        }
        match builtins::lookup(&segment.argv) {
            Some(Builtin::Exit) => return Ok(Flow::Exit),
            Some(Builtin::Cd) => {
                self.host.change_to_parent();
                return Ok(Flow::Continue);
            }
            None => {}
        }

        let pid = match self.host.spawn(&segment.argv) {
            Ok(pid) => pid,
            Err(err) => {
                eprintln!("mysh: {}", err);
                return Ok(Flow::Continue);
            }
        };
        crate::verbose!("started {} as process {} ({:?})", segment.name(), pid, segment.mode);

        match segment.mode {
            Mode::Sequential => {
                let code = self.host.wait(pid)?;
                writeln!(self.out, "[{} exited with status {}]", segment.name(), code)?;
            }
            Mode::Background => self.jobs.add_job(pid, segment.cmdline()),
        }
        Ok(Flow::Continue)
    }

    /// Checks every outstanding background job once without blocking and
    /// reports the ones that have exited.
    pub fn reap_background(&mut self) -> Result<(), ShellError> {
        if self.jobs.is_empty() {
            return Ok(());
        }
        let host = &mut self.host;
        let outcomes = self.jobs.sweep(|pid| host.try_wait(pid));
        for outcome in outcomes {
            match outcome {
                Outcome::Exited { job, status } => {
                    crate::verbose!("reaped background job '{}'", job.cmdline);
                    writeln!(
                        self.out,
                        "[background process {} exited with status {}]",
                        job.pid, status
                    )?;
                }
                Outcome::Failed { pid, error } => {
                    crate::verbose!("check of process {} abandoned", pid);
                    eprintln!("mysh: {}", error);
                }
            }
        }
        Ok(())
    }
}
