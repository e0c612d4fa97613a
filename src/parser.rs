use crate::error::ShellError;
use std::borrow::Cow;

/// Maximum number of tokens a single segment may carry, command name included.
pub const MAXARGS: usize = 128;

/// How the dispatcher treats the process started for a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Wait for the process before moving on (`;` or end of line).
    Sequential,
    /// Start the process and move on immediately (`&`).
    Background,
}

impl Mode {
    fn from_separator(sep: u8) -> Self {
        if sep == b'&' {
            Mode::Background
        } else {
            Mode::Sequential
        }
    }
}

fn is_separator(byte: &u8) -> bool {
    *byte == b';' || *byte == b'&'
}

/// One sub-command of a line: its argument vector and the separator that ended it.
///
/// Tokens are the raw bytes the operator typed; they need not be UTF-8.
#[derive(Debug, PartialEq, Eq)]
pub struct Segment<'a> {
    /// Command and its arguments. Empty for an all-whitespace segment.
    pub argv: Vec<&'a [u8]>,
    pub mode: Mode,
}

impl Segment<'_> {
    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }

    /// The command name for operator-facing reports.
    pub fn name(&self) -> Cow<'_, str> {
        self.argv
            .first()
            .map_or(Cow::Borrowed(""), |name| String::from_utf8_lossy(name))
    }

    /// The whole command, space separated, for operator-facing reports.
    pub fn cmdline(&self) -> String {
        String::from_utf8_lossy(&self.argv.join(&b' ')).into_owned()
    }
}

/// One line of input whose line terminator has been replaced by `;`.
#[derive(Debug, Clone)]
pub struct RawLine {
    bytes: Vec<u8>,
}

impl RawLine {
    /// Takes ownership of a line as read (with or without its `\n` / `\r\n`)
    /// and normalizes the terminator to `;`, so the last segment always ends
    /// with an explicit separator.
    pub fn new(mut line: Vec<u8>) -> Self {
        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        line.push(b';');
        RawLine { bytes: line }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Splits the line into segments borrowing from this buffer.
    pub fn segments(&self) -> Result<Vec<Segment<'_>>, ShellError> {
        split_segments(&self.bytes)
    }
}

/// Splits `text` into segments at every `;` and `&`, in left-to-right order.
///
/// Text after the last separator (only possible when the input was not
/// normalized through [`RawLine`]) becomes one final sequential segment.
/// Empty segments are kept; the dispatcher skips them.
pub fn split_segments(text: &[u8]) -> Result<Vec<Segment<'_>>, ShellError> {
    let mut segments = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let (body, mode, next) = match rest.iter().position(is_separator) {
            Some(pos) => (&rest[..pos], Mode::from_separator(rest[pos]), &rest[pos + 1..]),
            None => (rest, Mode::Sequential, &rest[rest.len()..]),
        };
        segments.push(Segment {
            argv: tokenize(body)?,
            mode,
        });
        rest = next;
    }
    Ok(segments)
}

fn tokens(body: &[u8]) -> impl Iterator<Item = &[u8]> {
    body.split(u8::is_ascii_whitespace)
        .filter(|token| !token.is_empty())
}

/// Splits one segment's text on ASCII whitespace, refusing more than [`MAXARGS`] tokens.
fn tokenize(body: &[u8]) -> Result<Vec<&[u8]>, ShellError> {
    let mut argv = Vec::new();
    for token in tokens(body) {
        if argv.len() == MAXARGS {
            return Err(ShellError::ArgumentOverflow {
                count: tokens(body).count(),
                max: MAXARGS,
            });
        }
        argv.push(token);
    }
    Ok(argv)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> RawLine {
        RawLine::new(text.as_bytes().to_vec())
    }

    fn argvs<'a>(segments: &[Segment<'a>]) -> Vec<(Vec<&'a str>, Mode)> {
        segments
            .iter()
            .map(|s| {
                let argv = s
                    .argv
                    .iter()
                    .map(|t| std::str::from_utf8(t).unwrap())
                    .collect();
                (argv, s.mode)
            })
            .collect()
    }

    #[test]
    fn test_tokenize_simple() {
        let tokens = tokenize(b"  ls   -l\t/tmp ").unwrap();
        assert_eq!(tokens, vec![b"ls".as_slice(), b"-l".as_slice(), b"/tmp".as_slice()]);
    }

    #[test]
    fn test_newline_becomes_separator() {
        assert_eq!(line("ls -l\n").as_bytes(), b"ls -l;");
        assert_eq!(line("ls\r\n").as_bytes(), b"ls;");
        assert_eq!(line("ls").as_bytes(), b"ls;");
    }

    #[test]
    fn test_single_command_is_one_sequential_segment() {
        let line = line("echo hello world\n");
        let segments = line.segments().unwrap();
        assert_eq!(
            argvs(&segments),
            vec![(vec!["echo", "hello", "world"], Mode::Sequential)]
        );
    }

    #[test]
    fn test_sequential_then_background() {
        let line = line("echo hi ; echo bye &\n");
        let segments = line.segments().unwrap();
        assert_eq!(
            argvs(&segments),
            vec![
                (vec!["echo", "hi"], Mode::Sequential),
                (vec!["echo", "bye"], Mode::Background),
                (vec![], Mode::Sequential),
            ]
        );
        assert!(segments[2].is_empty());
    }

    #[test]
    fn test_separators_only_yield_empty_segments() {
        let line = line(";;  & ;\n");
        let segments = line.segments().unwrap();
        assert_eq!(segments.len(), 5);
        assert!(segments.iter().all(Segment::is_empty));
        assert_eq!(segments[2].mode, Mode::Background);
    }

    #[test]
    fn test_separator_needs_no_surrounding_space() {
        let segments = split_segments(b"sleep 5&ls;pwd").unwrap();
        assert_eq!(
            argvs(&segments),
            vec![
                (vec!["sleep", "5"], Mode::Background),
                (vec!["ls"], Mode::Sequential),
                (vec!["pwd"], Mode::Sequential),
            ]
        );
    }

    #[test]
    fn test_unterminated_remainder_is_sequential() {
        let segments = split_segments(b"a & b").unwrap();
        assert_eq!(
            argvs(&segments),
            vec![(vec!["a"], Mode::Background), (vec!["b"], Mode::Sequential)]
        );
    }

    #[test]
    fn test_non_utf8_tokens_are_kept_verbatim() {
        let line = RawLine::new(b"ls \xff caf\xc3\xa9 \xfe\xfd&\n".to_vec());
        let segments = line.segments().unwrap();
        assert_eq!(
            segments[0].argv,
            vec![
                b"ls".as_slice(),
                b"\xff".as_slice(),
                b"caf\xc3\xa9".as_slice(),
                b"\xfe\xfd".as_slice(),
            ]
        );
        assert_eq!(segments[0].mode, Mode::Background);
        assert_eq!(segments[0].name(), "ls");
        assert_eq!(segments[0].cmdline(), "ls \u{fffd} café \u{fffd}\u{fffd}");
    }

    #[test]
    fn test_argument_limit() {
        let at_limit = vec!["x"; MAXARGS].join(" ");
        assert_eq!(tokenize(at_limit.as_bytes()).unwrap().len(), MAXARGS);

        let over = vec!["x"; MAXARGS + 2].join(" ");
        match split_segments(over.as_bytes()) {
            Err(ShellError::ArgumentOverflow { count, max }) => {
                assert_eq!(count, MAXARGS + 2);
                assert_eq!(max, MAXARGS);
            }
            other => panic!("expected overflow, got {:?}", other),
        }
    }
}
