//! Recording fake toolchain shared by the workflow tests.

use std::cell::RefCell;

use crate::error::Result;
use crate::toolchain::{CommandOutput, Toolchain};

/// Records every command and fails those matching a predicate.
pub(crate) struct FakeDocker {
    pub(crate) calls: RefCell<Vec<String>>,
    fails: Box<dyn Fn(&str) -> bool>,
    info: String,
}

impl FakeDocker {
    pub(crate) fn new(fails: impl Fn(&str) -> bool + 'static) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            fails: Box::new(fails),
            info: "Username: vellankikoti".into(),
        }
    }

    pub(crate) fn all_ok() -> Self {
        Self::new(|_| false)
    }

    pub(crate) fn with_info(mut self, info: &str) -> Self {
        self.info = info.into();
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, args: &[&str]) -> String {
        let line = args.join(" ");
        self.calls.borrow_mut().push(line.clone());
        line
    }
}

impl Toolchain for FakeDocker {
    fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let line = self.record(args);
        if (self.fails)(&line) {
            return Ok(CommandOutput::failed(format!("{line}: denied")));
        }
        Ok(match args.first() {
            Some(&"info") => CommandOutput::ok(self.info.clone()),
            Some(&"version") if args.len() > 1 => CommandOutput::ok("linux/amd64\n"),
            _ => CommandOutput::ok(""),
        })
    }

    fn run_interactive(&self, args: &[&str]) -> Result<bool> {
        let line = self.record(args);
        Ok(!(self.fails)(&line))
    }
}
