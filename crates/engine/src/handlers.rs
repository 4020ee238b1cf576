//! Regex-driven dispatch over render application output.

use regex::{Captures, Regex};

type Callback = Box<dyn Fn(&Captures<'_>) + Send + Sync>;

/// A group of patterns sharing one callback. The first pattern in the group
/// that matches a line fires the callback with its captures.
pub struct RegexCallback {
    regexes: Vec<Regex>,
    callback: Callback,
}

impl RegexCallback {
    pub fn new(
        regexes: Vec<Regex>,
        callback: impl Fn(&Captures<'_>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            regexes,
            callback: Box::new(callback),
        }
    }

    /// Run the callback if any pattern matches. Returns whether it fired.
    fn handle(&self, line: &str) -> bool {
        for regex in &self.regexes {
            if let Some(captures) = regex.captures(line) {
                (self.callback)(&captures);
                return true;
            }
        }
        false
    }
}

impl std::fmt::Debug for RegexCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegexCallback")
            .field("regexes", &self.regexes)
            .finish_non_exhaustive()
    }
}

/// Dispatches each output line to every callback group. Groups are
/// independent: a single line can report progress to one group and an error
/// to another.
#[derive(Debug, Default)]
pub struct RegexHandler {
    callbacks: Vec<RegexCallback>,
}

impl RegexHandler {
    pub fn new(callbacks: Vec<RegexCallback>) -> Self {
        Self { callbacks }
    }

    pub fn handle_line(&self, line: &str) {
        for callback in &self.callbacks {
            callback.handle(line);
        }
    }
}
