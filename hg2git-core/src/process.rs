use std::ffi::{OsStr, OsString};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Failure to run an external tool
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {}", describe_exit(.code))]
    Exit { command: String, code: Option<i32> },

    #[error("i/o error while running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },
}

impl ProcessError {
    /// Exit code of a command that ran and failed
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessError::Exit { code, .. } => *code,
            _ => None,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// Runs external tools synchronously in a fixed working directory.
///
/// Every command line is logged before it runs. Environment variables set on
/// the runner apply to each command it spawns, never to this process.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    current_dir: Option<PathBuf>,
    envs: Vec<(OsString, OsString)>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run commands in `dir` instead of the process working directory
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Set an environment variable for every spawned command
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Run a command with inherited stdin, stdout and stderr
    pub fn run<I, S>(&self, program: &str, args: I) -> Result<(), ProcessError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (mut cmd, command) = self.command(program, args);
        info!("$ {command}");
        let status = cmd
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| ProcessError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ProcessError::Exit {
                command,
                code: status.code(),
            });
        }
        Ok(())
    }

    /// Run a command and return its standard output, trimmed
    pub fn quote<I, S>(&self, program: &str, args: I) -> Result<String, ProcessError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (mut cmd, command) = self.command(program, args);
        info!("$ {command}");
        let output = cmd
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|source| ProcessError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProcessError::Exit {
                command,
                code: output.status.code(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        for line in text.lines() {
            debug!("> {line}");
        }
        Ok(text)
    }

    /// Run a command and hand its standard output to `read` as it is produced.
    ///
    /// If `read` fails the child is killed and that error is returned.
    /// Otherwise the child is waited for and a non-zero exit is an error.
    pub fn stream<I, S, T, E, F>(&self, program: &str, args: I, read: F) -> Result<T, E>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
        F: FnOnce(&mut dyn BufRead) -> Result<T, E>,
        E: From<ProcessError>,
    {
        let (mut cmd, command) = self.command(program, args);
        info!("$ {command}");
        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                command: command.clone(),
                source,
            })?;

        let Some(stdout) = child.stdout.take() else {
            return Err(ProcessError::Io {
                command,
                source: io::Error::new(io::ErrorKind::Other, "stdout was not captured"),
            }
            .into());
        };
        let mut reader = BufReader::new(stdout);
        let result = read(&mut reader);
        drop(reader);

        if result.is_err() {
            // The reader gave up; the child may still be writing.
            let _ = child.kill();
            let _ = child.wait();
            return result;
        }

        let status = child.wait().map_err(|source| ProcessError::Io {
            command: command.clone(),
            source,
        })?;
        if !status.success() {
            return Err(ProcessError::Exit {
                command,
                code: status.code(),
            }
            .into());
        }
        result
    }

    fn command<I, S>(&self, program: &str, args: I) -> (Command, String)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let rendered = render(program, &args);

        let mut cmd = Command::new(program);
        cmd.args(&args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        (cmd, rendered)
    }
}

/// Render a command line for logs, quoting arguments that contain whitespace
fn render(program: &str, args: &[OsString]) -> String {
    let mut line = program.to_string();
    for arg in args {
        let arg = arg.to_string_lossy();
        line.push(' ');
        if arg.is_empty() || arg.chars().any(char::is_whitespace) {
            line.push('"');
            line.push_str(&arg.replace('"', "\\\""));
            line.push('"');
        } else {
            line.push_str(&arg);
        }
    }
    line
}
