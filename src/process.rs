// ABOUTME: Narrow wrapper around external program execution
// ABOUTME: Drivers shell out through ProcessRunner so tests can swap in a fake

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// A program to run, with its arguments, extra environment and optional stdin file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub stdin: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Feed the contents of `path` to the program's standard input
    pub fn stdin(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    /// Value of a `--name=value` style argument, if present
    pub fn flag_value(&self, name: &str) -> Option<&str> {
        let prefix = format!("{}=", name);
        self.args
            .iter()
            .find_map(|arg| arg.strip_prefix(prefix.as_str()))
    }
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to execute {program}. Is it installed and in PATH?")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open stdin file {} for {program}", .path.display())]
    Stdin {
        program: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Non-zero exit; message is stderr when the program wrote any
    #[error("{program} failed: {message}")]
    Failed { program: String, message: String },
}

/// Executes external programs on behalf of a driver
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion and return captured stdout
    async fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, ProcessError>;
}

/// Runs programs on the local machine with tokio
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRunner;

#[async_trait]
impl ProcessRunner for CommandRunner {
    async fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, ProcessError> {
        tracing::debug!("exec {} {:?}", invocation.program, invocation.args);

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }

        match &invocation.stdin {
            Some(path) => {
                let file = std::fs::File::open(path).map_err(|source| ProcessError::Stdin {
                    program: invocation.program.clone(),
                    path: path.clone(),
                    source,
                })?;
                cmd.stdin(Stdio::from(file));
            }
            None => {
                cmd.stdin(Stdio::null());
            }
        }

        let output = cmd.output().await.map_err(|source| ProcessError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let message = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr.to_string()
            };
            return Err(ProcessError::Failed {
                program: invocation.program.clone(),
                message,
            });
        }

        Ok(output.stdout)
    }
}
