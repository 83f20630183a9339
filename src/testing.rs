//! Scripted command runner shared by unit tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::process::{CommandResult, CommandRunner};

#[derive(Debug, Clone)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub interactive: bool,
}

impl Call {
    pub fn line(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

struct Rule {
    needle: String,
    responses: VecDeque<CommandResult>,
}

/// Answers each call with the first rule whose needle appears in the command
/// line. A rule replays its responses in order and repeats the last one.
/// Unmatched calls get [`CommandResult::failure`].
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, needle: &str, response: CommandResult) -> Self {
        self.on_sequence(needle, vec![response])
    }

    pub fn on_sequence(self, needle: &str, responses: Vec<CommandResult>) -> Self {
        self.rules.lock().unwrap().push(Rule {
            needle: needle.to_string(),
            responses: responses.into(),
        });
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.line().contains(needle))
            .count()
    }

    fn answer(&self, call: Call) -> CommandResult {
        let line = call.line();
        self.calls.lock().unwrap().push(call);

        let mut rules = self.rules.lock().unwrap();
        for rule in rules.iter_mut() {
            if line.contains(&rule.needle) {
                return if rule.responses.len() > 1 {
                    rule.responses.pop_front().unwrap_or_else(CommandResult::failure)
                } else {
                    rule.responses.front().cloned().unwrap_or_else(CommandResult::failure)
                };
            }
        }
        CommandResult::failure()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, executable: &str, args: &[String], working_dir: &Path) -> CommandResult {
        self.answer(Call {
            program: executable.to_string(),
            args: args.to_vec(),
            working_dir: working_dir.to_path_buf(),
            interactive: false,
        })
    }

    async fn run_interactive(
        &self,
        executable: &str,
        args: &[String],
        working_dir: &Path,
    ) -> CommandResult {
        self.answer(Call {
            program: executable.to_string(),
            args: args.to_vec(),
            working_dir: working_dir.to_path_buf(),
            interactive: true,
        })
    }
}
