/// Commands the interpreter runs itself instead of spawning a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// Always moves to the parent directory; arguments are ignored.
    Cd,
    /// Terminates the interpreter immediately with status 0.
    Exit,
}

/// Checks whether `argv` names a built-in command.
/// Returns `None` for external commands and for an empty argument vector.
pub fn lookup(argv: &[&[u8]]) -> Option<Builtin> {
    match argv.first().copied() {
        Some(b"cd") => Some(Builtin::Cd),
        Some(b"exit") => Some(Builtin::Exit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv<'a>(words: &[&'a str]) -> Vec<&'a [u8]> {
        words.iter().map(|w| w.as_bytes()).collect()
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup(&argv(&["cd"])), Some(Builtin::Cd));
        assert_eq!(lookup(&argv(&["cd", "/usr/local"])), Some(Builtin::Cd));
        assert_eq!(lookup(&argv(&["exit", "3"])), Some(Builtin::Exit));
        assert_eq!(lookup(&argv(&["ls", "cd"])), None);
        assert_eq!(lookup(&[b"exit\xff".as_slice()]), None);
        assert_eq!(lookup(&[]), None);
    }
}
