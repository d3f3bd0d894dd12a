// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::io::{BufRead, Write};

use crate::errors::SecretsError;

/// Line based operator I/O. Production wires stdin/stdout, tests use
/// in-memory buffers.
pub struct Terminal<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn println(&mut self, line: &str) -> Result<(), SecretsError> {
        writeln!(self.output, "{line}")?;
        Ok(())
    }

    /// Prints `prompt` and reads one line without its line terminator.
    /// End of input reads as an empty answer.
    pub fn ask(&mut self, prompt: &str) -> Result<String, SecretsError> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        let trimmed = answer.trim_end_matches(['\n', '\r']).len();
        answer.truncate(trimmed);
        Ok(answer)
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_strips_line_terminator() {
        let mut terminal = Terminal::new("value with spaces \r\nnext\n".as_bytes(), Vec::new());
        assert_eq!(terminal.ask("? ").unwrap(), "value with spaces ");
        assert_eq!(terminal.ask("? ").unwrap(), "next");
        assert_eq!(terminal.ask("? ").unwrap(), "");
        assert_eq!(String::from_utf8(terminal.into_output()).unwrap(), "? ? ? ");
    }
}
