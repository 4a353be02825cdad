//! Notebook host backed by an external executor process
//!
//! The notebook file's saved outputs play the part of the displayed outputs.
//! Executing all cells writes a working copy next to the notebook (so the
//! kernel starts in the notebook's directory), runs the configured executor
//! on it and reloads the executed result once the process exits.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::process::{Child, Command};

use crate::common::config::ExecutorConfig;
use crate::common::{Error, Result};
use crate::fixture::Fixture;
use crate::notebook::Notebook;

use super::{HostCell, NotebookHost};

enum RunState {
    Idle,
    Running {
        child: Child,
        // Held so the files live until the executor is done with them
        _input: NamedTempFile,
        output: NamedTempFile,
    },
    Finished,
}

impl RunState {
    fn name(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running { .. } => "running",
            RunState::Finished => "finished",
        }
    }
}

/// Host that executes an `.ipynb` file with an external command
pub struct ProcessHost {
    source: PathBuf,
    label: String,
    notebook: Notebook,
    executor: ExecutorConfig,
    prologue: Vec<String>,
    run: RunState,
    verbose: bool,
}

impl ProcessHost {
    /// Load the notebook at `path`; nothing runs until cells are executed
    pub fn open(path: &Path, executor: ExecutorConfig) -> Result<Self> {
        let notebook = Notebook::load(path)?;
        // executor paths are resolved from the notebook's directory
        let source = std::fs::canonicalize(path).map_err(|e| Error::notebook_read(path, &e))?;
        Ok(Self {
            source,
            label: path.display().to_string(),
            notebook,
            executor,
            prologue: Vec::new(),
            run: RunState::Idle,
            verbose: false,
        })
    }

    /// Let the executor write to this process's stdout/stderr
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Canonical path of the notebook file
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Cassette next to the notebook file, whatever path it was opened by
    pub fn fixture(&self, extension: &str) -> Fixture {
        Fixture::for_notebook(&self.source.display().to_string(), extension)
    }

    /// The notebook as currently held (executed once the run finished)
    pub fn notebook(&self) -> &Notebook {
        &self.notebook
    }

    fn working_dir(&self) -> &Path {
        match self.source.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    fn temp_notebook(&self) -> Result<NamedTempFile> {
        Ok(tempfile::Builder::new()
            .prefix(".nbverify-")
            .suffix(".ipynb")
            .tempfile_in(self.working_dir())?)
    }

    fn executor_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.display().to_string();
        let output = output.display().to_string();
        self.executor
            .args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }

    fn finish(&mut self, status: ExitStatus) -> Result<()> {
        let RunState::Running { output, .. } = std::mem::replace(&mut self.run, RunState::Finished)
        else {
            return Ok(());
        };

        if !status.success() {
            tracing::warn!(
                "Executor '{}' exited with {} for {}",
                self.executor.program,
                status,
                self.label
            );
        }

        let written = std::fs::metadata(output.path())?.len();
        if written == 0 {
            return Err(Error::ExecutorOutputMissing(output.path().display().to_string()));
        }

        let mut executed = Notebook::load(output.path())?;
        executed.remove_injected_cells();
        self.notebook = executed;
        tracing::debug!("Reloaded executed notebook {}", self.label);
        Ok(())
    }
}

#[async_trait]
impl NotebookHost for ProcessHost {
    fn notebook_path(&self) -> &str {
        &self.label
    }

    async fn is_connected(&mut self) -> bool {
        match which::which(&self.executor.program) {
            Ok(path) => {
                tracing::trace!("Executor found at {}", path.display());
                true
            }
            Err(e) => {
                tracing::debug!("Executor '{}' not available: {}", self.executor.program, e);
                false
            }
        }
    }

    async fn is_busy(&mut self) -> Result<bool> {
        let RunState::Running { child, .. } = &mut self.run else {
            return Ok(false);
        };
        let Some(status) = child.try_wait()? else {
            return Ok(true);
        };
        self.finish(status)?;
        Ok(false)
    }

    async fn cells(&self) -> Result<Vec<HostCell>> {
        Ok(self.notebook.host_cells())
    }

    async fn execute(&mut self, code: &str) -> Result<()> {
        match self.run {
            RunState::Idle => {
                tracing::debug!("Queued {} bytes of kernel code before the run", code.len());
                self.prologue.push(code.to_string());
            }
            _ => {
                // the executor's kernel is gone once the process exits
                tracing::warn!(
                    "Dropping kernel code submitted while the notebook is {}",
                    self.run.name()
                );
            }
        }
        Ok(())
    }

    async fn clear_all_output(&mut self) -> Result<()> {
        self.notebook.clear_outputs();
        Ok(())
    }

    async fn execute_all_cells(&mut self) -> Result<()> {
        if !matches!(self.run, RunState::Idle) {
            return Err(Error::invalid_state("execute all cells", self.run.name()));
        }

        let mut working = self.notebook.clone();
        working.inject_leading_cells(&self.prologue);

        let input = self.temp_notebook()?;
        let output = self.temp_notebook()?;
        working.save(input.path())?;

        let args = self.executor_args(input.path(), output.path());
        tracing::info!("Executing {} with {}", self.label, self.executor.program);
        tracing::debug!("Executor arguments: {:?}", args);

        let stdio = || {
            if self.verbose {
                Stdio::inherit()
            } else {
                Stdio::null()
            }
        };
        let child = Command::new(&self.executor.program)
            .args(&args)
            .current_dir(self.working_dir())
            .stdin(Stdio::null())
            .stdout(stdio())
            .stderr(stdio())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::ExecutorSpawn {
                program: self.executor.program.clone(),
                error: e.to_string(),
            })?;

        self.run = RunState::Running {
            child,
            _input: input,
            output,
        };
        Ok(())
    }
}
