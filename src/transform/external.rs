// src/transform/external.rs

//! Adapter that pipes asset contents through a shell command.
//!
//! The command receives the asset on stdin and must write the result to
//! stdout. The asset's path is exported as `THEMEFORGE_ASSET` so tools that
//! need a file name (e.g. for syntax detection) can pick it up.

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::errors::{BuildError, Result};
use crate::transform::{LintFinding, Linter, Transform};

/// Environment variable holding the destination-relative asset path.
pub const ASSET_ENV: &str = "THEMEFORGE_ASSET";

#[derive(Debug, Clone)]
pub struct ExternalCommand {
    name: String,
    cmd: String,
}

impl ExternalCommand {
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
        }
    }

    fn shell(&self) -> Command {
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        }
    }

    /// Run the command with `input` on stdin and collect its output.
    fn run(&self, path: &str, input: &[u8]) -> Result<std::process::Output> {
        debug!(tool = %self.name, cmd = %self.cmd, path, "running external tool");

        let mut child = self
            .shell()
            .env(ASSET_ENV, path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BuildError::ExternalProcess {
                cmd: self.cmd.clone(),
                code: None,
                stderr: format!("failed to spawn: {e}"),
            })?;

        // Feed stdin from another thread so a tool that writes before it has
        // read everything cannot deadlock against us.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = input.to_vec();
            std::thread::spawn(move || stdin.write_all(&input))
        });

        let output = child.wait_with_output().map_err(|e| BuildError::ExternalProcess {
            cmd: self.cmd.clone(),
            code: None,
            stderr: format!("failed to wait: {e}"),
        })?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // A tool may legitimately exit without draining stdin.
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => {
                    return Err(BuildError::ExternalProcess {
                        cmd: self.cmd.clone(),
                        code: None,
                        stderr: format!("failed to write stdin: {e}"),
                    });
                }
                Err(_) => {
                    return Err(BuildError::ExternalProcess {
                        cmd: self.cmd.clone(),
                        code: None,
                        stderr: "stdin writer panicked".to_string(),
                    });
                }
            }
        }

        Ok(output)
    }
}

impl Transform for ExternalCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, path: &str, input: &[u8]) -> Result<Vec<u8>> {
        let output = self.run(path, input)?;
        if !output.status.success() {
            return Err(BuildError::ExternalProcess {
                cmd: self.cmd.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

/// As a linter, every non-empty line the tool prints (stdout or stderr) is a
/// finding when it exits non-zero. A clean exit means no findings.
impl Linter for ExternalCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn lint(&self, path: &str, input: &[u8]) -> Result<Vec<LintFinding>> {
        let output = self.run(path, input)?;
        if output.status.success() {
            return Ok(Vec::new());
        }

        let text = [output.stdout.as_slice(), output.stderr.as_slice()].concat();
        let mut findings: Vec<LintFinding> = String::from_utf8_lossy(&text)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|line| LintFinding {
                linter: self.name.clone(),
                path: path.to_string(),
                line: None,
                message: line.to_string(),
            })
            .collect();

        if findings.is_empty() {
            findings.push(LintFinding {
                linter: self.name.clone(),
                path: path.to_string(),
                line: None,
                message: format!("exited with status {:?}", output.status.code()),
            });
        }
        Ok(findings)
    }
}
