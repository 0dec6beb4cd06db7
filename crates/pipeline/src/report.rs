use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

use narrate_storage::Effort;

use crate::error::Stage;

/// Outcome of one stage of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub key: PathBuf,
    pub effort: Effort,
}

/// What a run did, stage by stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub base: String,
    pub stages: Vec<StageReport>,
}
impl Report {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into(), stages: Vec::new() }
    }

    pub(crate) fn push(&mut self, stage: Stage, key: PathBuf, effort: Effort) {
        self.stages.push(StageReport { stage, key, effort });
    }

    pub fn effort(&self, stage: Stage) -> Option<Effort> {
        self.stages.iter().find(|report| report.stage == stage).map(|report| report.effort)
    }

    /// Key of the final audio artifact.
    pub fn output(&self) -> Option<&PathBuf> {
        self.stages.iter().find(|report| report.stage == Stage::Package).map(|report| &report.key)
    }

    /// True when every stage was a cache hit.
    pub fn fully_cached(&self) -> bool {
        self.stages.iter().all(|report| report.effort == Effort::Cached)
    }
}
impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "{}", self.base)?;
        for report in &self.stages {
            let (stage, effort) = (report.stage.to_string(), report.effort.to_string());
            writeln!(f, "  {stage:<10} {effort:<9} {}", report.key.display())?;
        }
        Ok(())
    }
}
