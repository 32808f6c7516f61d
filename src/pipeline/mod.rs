// Staged provisioning pipeline
//
// Stages run strictly in order against one PipelineState. Each stage
// declares the flags it reads and writes; `Pipeline::new` refuses an order in
// which a flag is read before its producer runs.

pub mod stages;

use crate::cli::output::{format_step_header, rule_width};
use crate::cli::prompt::Console;
use crate::config::Settings;
use crate::error::ProvisionError;
use crate::host::Host;
use crate::models::{Flag, PipelineState};
use anyhow::{Context, Result};
use std::collections::HashMap;

/// Result of a stage that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    /// Declined by the operator or not applicable. Not an error.
    Skipped(String),
}

/// Everything a stage may touch while it runs
pub struct StageContext<'a, 'c> {
    pub host: &'a mut dyn Host,
    pub console: &'a mut Console<'c>,
    pub settings: &'a Settings,
    pub state: &'a mut PipelineState,
}

/// One cohesive provisioning step
pub trait Stage {
    fn name(&self) -> &'static str;

    /// Flags this stage consumes
    fn reads(&self) -> &'static [Flag] {
        &[]
    }

    /// Flags this stage produces
    fn writes(&self) -> &'static [Flag] {
        &[]
    }

    fn run(&self, ctx: &mut StageContext<'_, '_>) -> Result<StageOutcome>;
}

/// Outcome of a full run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub state: PipelineState,
    pub outcomes: Vec<(&'static str, StageOutcome)>,
}

impl PipelineReport {
    pub fn outcome(&self, stage: &str) -> Option<&StageOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| *name == stage)
            .map(|(_, outcome)| outcome)
    }
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Build a pipeline, verifying that every read flag has exactly one
    /// producer ordered before the reader.
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Result<Self, ProvisionError> {
        let mut producers: HashMap<Flag, &'static str> = HashMap::new();

        for stage in &stages {
            for flag in stage.reads() {
                // A stage may read a flag it writes itself, after writing it
                let own = stage.writes().contains(flag);
                if !own && !producers.contains_key(flag) {
                    return Err(ProvisionError::FlagOrder {
                        stage: stage.name().to_string(),
                        flag: *flag,
                    });
                }
            }
            for flag in stage.writes() {
                if let Some(first) = producers.insert(*flag, stage.name()) {
                    return Err(ProvisionError::DuplicateProducer {
                        flag: *flag,
                        first: first.to_string(),
                        second: stage.name().to_string(),
                    });
                }
            }
        }

        Ok(Self { stages })
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Run every stage in order, stopping at the first failure
    pub fn run(
        &self,
        host: &mut dyn Host,
        console: &mut Console<'_>,
        settings: &Settings,
    ) -> Result<PipelineReport> {
        let mut state = PipelineState::new();
        let mut outcomes = Vec::with_capacity(self.stages.len());
        let total = self.stages.len();
        let width = rule_width();

        for (index, stage) in self.stages.iter().enumerate() {
            let header = format_step_header(&console.palette(), index + 1, total, stage.name(), width);
            console.line(&header)?;
            log::info!("stage {}/{}: {}", index + 1, total, stage.name());

            let mut ctx = StageContext {
                host: &mut *host,
                console: &mut *console,
                settings,
                state: &mut state,
            };
            let outcome = stage
                .run(&mut ctx)
                .with_context(|| format!("Stage '{}' failed", stage.name()))?;

            for flag in stage.writes() {
                if !state.is_recorded(*flag) {
                    return Err(ProvisionError::FlagUnset(*flag))
                        .with_context(|| format!("Stage '{}' finished without recording {}", stage.name(), flag));
                }
            }

            match &outcome {
                StageOutcome::Completed => log::info!("stage {} completed", stage.name()),
                StageOutcome::Skipped(reason) => {
                    log::info!("stage {} skipped: {}", stage.name(), reason);
                    console.info(&format!("Skipped: {}", reason))?;
                }
            }
            outcomes.push((stage.name(), outcome));
        }

        Ok(PipelineReport { state, outcomes })
    }
}
