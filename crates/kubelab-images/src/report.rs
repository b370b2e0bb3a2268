//! Progress output shared by the build and pull workflows.

use std::io::Write;

use crate::error::Result;
use crate::toolchain::Toolchain;

const RULE_WIDTH: usize = 60;

/// Outcome of a whole workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Scenarios processed.
    pub total: usize,
    /// Scenarios that completed every step.
    pub succeeded: usize,
    /// What failed, in order.
    pub failed: Vec<String>,
}

impl Summary {
    /// Whether nothing failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Writes human-readable progress to a terminal or buffer.
pub struct Reporter<'a> {
    out: &'a mut dyn Write,
}

impl<'a> Reporter<'a> {
    /// Reports to `out`.
    pub fn new(out: &'a mut dyn Write) -> Self {
        Self { out }
    }

    /// A boxed section title.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    pub fn header(&mut self, title: &str) -> Result<()> {
        let rule = "=".repeat(RULE_WIDTH);
        write!(self.out, "\n{rule}\n  {title}\n{rule}\n\n")?;
        Ok(())
    }

    /// A single line of text.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    pub fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    /// The `[i/n] Processing: name` banner opening each scenario.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    pub fn progress(&mut self, index: usize, total: usize, name: &str) -> Result<()> {
        write!(
            self.out,
            "\n[{index}/{total}] Processing: {name}\n{}\n",
            "-".repeat(RULE_WIDTH)
        )?;
        Ok(())
    }

    /// Runs one toolchain command and reports whether it succeeded.
    ///
    /// A command that cannot even be started counts as a failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    pub fn step(&mut self, toolchain: &dyn Toolchain, args: &[&str], description: &str) -> Result<bool> {
        writeln!(self.out, "▶ {description}")?;
        let (ok, stderr) = match toolchain.run(args) {
            Ok(output) => (output.success, output.stderr),
            Err(e) => (false, e.to_string()),
        };
        if ok {
            write!(self.out, "✅ {description} - SUCCESS\n\n")?;
        } else {
            tracing::warn!(description, stderr = %stderr.trim(), "command failed");
            write!(self.out, "❌ {description} - FAILED\nError: {stderr}\n\n")?;
        }
        Ok(ok)
    }

    /// Totals and the list of failures.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    pub fn summary(&mut self, title: &str, summary: &Summary, failed_label: &str) -> Result<()> {
        self.header(title)?;
        writeln!(self.out, "Total scenarios: {}", summary.total)?;
        writeln!(self.out, "✅ Successful: {}", summary.succeeded)?;
        writeln!(self.out, "❌ Failed: {}", summary.failed.len())?;
        if !summary.is_success() {
            writeln!(self.out, "\n{failed_label}:")?;
            for failure in &summary.failed {
                writeln!(self.out, "  - {failure}")?;
            }
        }
        Ok(())
    }
}
