//! Explicit collaborator context, built once and handed to the scheduler.

use crate::guard::AutonomyGuard;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use weaver_core::Availability;
use weaver_llm::Generator;
use weaver_tools::{VersionControl, Workspace};

pub const GENERATOR: &str = "generator";
pub const WORKSPACE: &str = "workspace";
pub const VCS: &str = "vcs";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum CollaboratorStatus {
    Ok,
    Missing,
    /// Present but expected to fail at call time. Does not block readiness.
    Degraded(String),
}

impl From<Availability> for CollaboratorStatus {
    fn from(a: Availability) -> Self {
        match a {
            Availability::Available => Self::Ok,
            Availability::Degraded(reason) => Self::Degraded(reason),
        }
    }
}

#[derive(Clone, Default)]
pub struct Collaborators {
    pub generator: Option<Arc<dyn Generator>>,
    pub workspace: Option<Arc<dyn Workspace>>,
    pub vcs: Option<Arc<dyn VersionControl>>,
    /// Path and volume gate for writes. Without one every parsed block is written.
    pub guard: Option<AutonomyGuard>,
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_workspace(mut self, workspace: Arc<dyn Workspace>) -> Self {
        self.workspace = Some(workspace);
        self
    }

    pub fn with_vcs(mut self, vcs: Arc<dyn VersionControl>) -> Self {
        self.vcs = Some(vcs);
        self
    }

    pub fn with_guard(mut self, guard: AutonomyGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Names of declared collaborators that were never supplied.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.generator.is_none() {
            missing.push(GENERATOR);
        }
        if self.workspace.is_none() {
            missing.push(WORKSPACE);
        }
        if self.vcs.is_none() {
            missing.push(VCS);
        }
        missing
    }

    pub async fn validate(&self) -> BTreeMap<&'static str, CollaboratorStatus> {
        let mut status = BTreeMap::new();
        status.insert(
            GENERATOR,
            match &self.generator {
                Some(g) => g.probe().await.into(),
                None => CollaboratorStatus::Missing,
            },
        );
        status.insert(
            WORKSPACE,
            match &self.workspace {
                Some(w) => w.probe().await.into(),
                None => CollaboratorStatus::Missing,
            },
        );
        status.insert(
            VCS,
            match &self.vcs {
                Some(v) => v.probe().await.into(),
                None => CollaboratorStatus::Missing,
            },
        );
        status
    }
}
