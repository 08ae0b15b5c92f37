//! Process execution for build plans.

use super::Invocation;
use crate::error::BuildError;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::process::Command;

/// Runs one invocation. Implementations must not retry.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation, env: &BTreeMap<String, String>) -> Result<(), BuildError>;
}

/// Runs invocations as child processes, inheriting stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation, env: &BTreeMap<String, String>) -> Result<(), BuildError> {
        log::info!("Running: {}", invocation);
        if !invocation.cwd.exists() {
            std::fs::create_dir_all(&invocation.cwd)?;
        }
        run_command(&invocation.program, &invocation.args, invocation, env)
    }
}

fn run_command(
    program: &str,
    args: &[String],
    invocation: &Invocation,
    env: &BTreeMap<String, String>,
) -> Result<(), BuildError> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.current_dir(&invocation.cwd);
    cmd.envs(env);

    let status = cmd.status().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BuildError::Config(format!("program not found: {}", program))
        } else {
            BuildError::Io(e)
        }
    })?;
    if status.success() {
        Ok(())
    } else {
        Err(BuildError::CommandFailed {
            command: invocation.to_string(),
            code: status.code(),
        })
    }
}

/// Records invocations instead of running them (`--dry-run`, tests).
///
/// An optional hook runs for each recorded invocation, e.g. to fake the
/// files an install step would produce. A program listed in `fail_on`
/// fails with exit code 1.
#[derive(Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<Invocation>>,
    fail_on: Vec<String>,
    #[allow(clippy::type_complexity)]
    hook: Option<Box<dyn Fn(&Invocation) -> std::io::Result<()>>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail when `program` (or a path ending in it) is invoked.
    pub fn failing_on(mut self, program: &str) -> Self {
        self.fail_on.push(program.to_string());
        self
    }

    pub fn with_hook(mut self, hook: impl Fn(&Invocation) -> std::io::Result<()> + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Invocations seen so far.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation, _env: &BTreeMap<String, String>) -> Result<(), BuildError> {
        log::info!("[dry-run] {}", invocation);
        self.calls.borrow_mut().push(invocation.clone());
        if let Some(hook) = &self.hook {
            hook(invocation)?;
        }
        let failing = self
            .fail_on
            .iter()
            .any(|p| invocation.program == *p || invocation.program.ends_with(&format!("/{}", p)));
        if failing {
            return Err(BuildError::CommandFailed {
                command: invocation.to_string(),
                code: Some(1),
            });
        }
        Ok(())
    }
}
