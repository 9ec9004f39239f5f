use std::fmt;

/// A store command as an ordered argument vector.
///
/// The first argument is the command name. Every argument is an opaque byte
/// buffer with an explicit length.
#[derive(Clone, PartialEq, Eq)]
pub struct Command {
    args: Vec<Vec<u8>>,
}

impl Command {
    /// Start a command with its name.
    pub fn new(name: &str) -> Self {
        Self {
            args: vec![name.as_bytes().to_vec()],
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl AsRef<[u8]>) -> Self {
        self.args.push(arg.as_ref().to_vec());
        self
    }

    /// Append every argument from an iterator, in order.
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: AsRef<[u8]>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_vec()));
        self
    }

    /// Append an integer argument in decimal.
    pub fn int_arg(self, value: i64) -> Self {
        self.arg(value.to_string())
    }

    /// The command name, lossily decoded.
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.args[0]).into_owned()
    }

    /// All arguments including the name.
    pub fn parts(&self) -> &[Vec<u8>] {
        &self.args
    }

    /// Number of arguments including the name.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Always `false`: a command carries at least its name.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

// Arguments may be binary, so Debug shows the name and sizes only.
impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sizes: Vec<usize> = self.args[1..].iter().map(Vec::len).collect();
        f.debug_struct("Command")
            .field("name", &self.name())
            .field("arg_sizes", &sizes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_order() {
        let cmd = Command::new("SADD").arg("er:all").arg(b"alice");
        assert_eq!(cmd.len(), 3);
        assert_eq!(cmd.parts()[1], b"er:all".to_vec());
        assert_eq!(cmd.parts()[2], b"alice".to_vec());
    }

    #[test]
    fn binary_args_survive() {
        let payload = [0u8, 13, 10, 0, 255];
        let cmd = Command::new("HSET").arg("k").arg("f").arg(payload);
        assert_eq!(cmd.parts()[3], payload.to_vec());
    }

    #[test]
    fn args_and_int_arg() {
        let cmd = Command::new("SINTER").args(["a", "b"]).int_arg(-7);
        assert_eq!(cmd.name(), "SINTER");
        assert_eq!(cmd.parts()[3], b"-7".to_vec());
    }

    #[test]
    fn debug_does_not_dump_payloads() {
        let cmd = Command::new("HSET").arg("k").arg(vec![0u8; 512]);
        let debug = format!("{cmd:?}");
        assert!(debug.contains("HSET"));
        assert!(debug.contains("512"));
    }
}
