//! Symbol demangling through an external `c++filt`-compatible tool.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DemangleError {
    #[error("Failed to run demangler {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Demangler {program} exited with {status}: {stderr}")]
    Exit { program: PathBuf, status: String, stderr: String },

    #[error("Demangler returned {found} names for {expected} inputs")]
    LineCount { expected: usize, found: usize },
}

/// Turns raw linker symbol names into their source-level spelling.
///
/// Implementations return exactly one output per input, in input order.
pub trait Demangler {
    fn demangle(&self, names: &[String]) -> Result<Vec<String>, DemangleError>;
}

/// Pipes every name through one invocation of `c++filt` (or a compatible tool).
#[derive(Debug, Clone)]
pub struct CxxFilt {
    program: PathBuf,
}

impl CxxFilt {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }
}

impl Default for CxxFilt {
    fn default() -> Self {
        Self::new("c++filt")
    }
}

impl Demangler for CxxFilt {
    fn demangle(&self, names: &[String]) -> Result<Vec<String>, DemangleError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let spawn_err = |source| DemangleError::Spawn { program: self.program.clone(), source };

        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        // Written from a scoped thread so a large batch cannot deadlock on a
        // full stdout pipe.
        let input = names.join("\n");
        let mut stdin = child.stdin.take();
        let output = std::thread::scope(|scope| {
            scope.spawn(move || {
                if let Some(stdin) = stdin.as_mut() {
                    let _ = stdin.write_all(input.as_bytes());
                    let _ = stdin.write_all(b"\n");
                }
            });
            child.wait_with_output()
        })
        .map_err(spawn_err)?;

        if !output.status.success() {
            return Err(DemangleError::Exit {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let demangled: Vec<String> = stdout.lines().map(str::to_string).collect();
        if demangled.len() != names.len() {
            return Err(DemangleError::LineCount { expected: names.len(), found: demangled.len() });
        }
        Ok(demangled)
    }
}
