//! Indenting text buffer shared by the emitters.

/// Accumulates generated C text.
#[derive(Debug, Default)]
pub struct CodeWriter {
    output: String,
    indent: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Write an indented line.
    pub fn writeln(&mut self, s: &str) {
        self.write(s);
        self.output.push('\n');
    }

    /// Write indented text without ending the line.
    pub fn write(&mut self, s: &str) {
        for _ in 0..self.indent {
            self.output.push_str("    ");
        }
        self.output.push_str(s);
    }

    /// Append text to the current line.
    pub fn push_str(&mut self, s: &str) {
        self.output.push_str(s);
    }

    pub fn blank_line(&mut self) {
        self.output.push('\n');
    }

    pub fn as_str(&self) -> &str {
        &self.output
    }

    pub fn into_string(self) -> String {
        self.output
    }
}
