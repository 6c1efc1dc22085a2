///! Connector contract shared by the four feeds

use async_trait::async_trait;
use corona_common::CoronaState;
use std::fmt;
use std::sync::Arc;

use crate::error::{EngineError, Result};

/// Which scheduled tick a connector runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CadenceClass {
    Regular,
    Frequent,
}

impl CadenceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Frequent => "frequent",
        }
    }
}

impl fmt::Display for CadenceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a connector produced nothing to persist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoChangeReason {
    /// The feed's as-of date is older than what is stored
    Outdated,
    /// Same as-of date and same content
    Unchanged,
    /// The connector needs an incidence document first
    Postponed,
    /// The server reports the file as not modified
    NotModified,
}

impl fmt::Display for NoChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Outdated => "outdated",
            Self::Unchanged => "unchanged",
            Self::Postponed => "postponed",
            Self::NotModified => "not modified",
        };
        f.write_str(text)
    }
}

#[derive(Debug)]
pub enum UpdateOutcome {
    Updated(Box<CoronaState>),
    NoChange(NoChangeReason),
    Failed(EngineError),
}

/// Result of the pure reconcile step of a connector
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    Updated(CoronaState),
    NoChange(NoChangeReason),
}

impl From<Result<Reconciled>> for UpdateOutcome {
    fn from(result: Result<Reconciled>) -> Self {
        match result {
            Ok(Reconciled::Updated(state)) => Self::Updated(Box::new(state)),
            Ok(Reconciled::NoChange(reason)) => Self::NoChange(reason),
            Err(e) => Self::Failed(e),
        }
    }
}

/// One upstream feed.
///
/// `update` never mutates `previous`; an accepted result is a complete new
/// document that the orchestrator persists.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Log prefix, e.g. `[INC]`
    fn id(&self) -> &'static str;

    fn cadence(&self) -> CadenceClass;

    async fn update(&self, previous: Option<Arc<CoronaState>>) -> UpdateOutcome;
}
