//! The interpreter context: configuration plus the read-execute loop.

use crate::config::{Config, ResourcePolicy};
use crate::error::PipelineError;
use crate::pipeline::{run_pipeline, Pipeline, PipelineReport, StageOptions};
use crate::reader::LineReader;
use anyhow::{Context, Result};
use std::io::{BufRead, Write};

pub struct Shell {
    config: Config,
    stage_opts: StageOptions,
}

impl Shell {
    pub fn new(config: Config) -> Self {
        let stage_opts = StageOptions::from(&config);
        Shell { config, stage_opts }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one command line to completion.
    ///
    /// Problems confined to this line are reported on stderr and give `Ok(None)`.
    /// A pipe or fork failure is returned only when the resource policy is `exit`.
    pub fn execute_line(&mut self, line: &str) -> Result<Option<PipelineReport>, PipelineError> {
        let pipeline = match Pipeline::parse(line, &self.config.limits) {
            Ok(Some(pipeline)) => pipeline,
            Ok(None) => return Ok(None),
            Err(e) => {
                eprintln!("smsh-rs: {e}");
                return Ok(None);
            }
        };
        log::debug!("parsed {} stage(s) from {line:?}", pipeline.len());
        match run_pipeline(pipeline.stages(), &self.stage_opts) {
            Ok(report) => Ok(Some(report)),
            Err(e) if e.is_resource_exhaustion() && self.config.policy.resource_exhaustion == ResourcePolicy::AbortCommand => {
                eprintln!("smsh-rs: {e}");
                log::warn!("command abandoned after resource failure");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Execute lines until the reader is exhausted. The prompt is shown only when `interactive`.
    pub fn run<R: BufRead, W: Write>(&mut self, reader: &mut LineReader<R, W>, interactive: bool) -> Result<()> {
        let prompt = interactive.then(|| self.config.shell.prompt.clone());
        while let Some(line) = reader.next_line(prompt.as_deref()).context("reading command line")? {
            self.execute_line(&line)?;
        }
        Ok(())
    }
}
