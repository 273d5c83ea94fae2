use crate::error::{PlaneError, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Kinds of remote entities the CLI can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Project,
    WorkItem,
    User,
    Module,
    State,
    Cycle,
    Label,
    Comment,
    Document,
}

impl ResourceKind {
    /// Command group that lists resources of this kind.
    pub fn command(&self) -> &'static str {
        match self {
            ResourceKind::Project => "project",
            ResourceKind::WorkItem => "wi",
            ResourceKind::User => "user",
            ResourceKind::Module => "module",
            ResourceKind::State => "state",
            ResourceKind::Cycle => "cycle",
            ResourceKind::Label => "label",
            ResourceKind::Comment => "comment",
            ResourceKind::Document => "doc",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Project => write!(f, "Project"),
            ResourceKind::WorkItem => write!(f, "Work item"),
            ResourceKind::User => write!(f, "User"),
            ResourceKind::Module => write!(f, "Module"),
            ResourceKind::State => write!(f, "State"),
            ResourceKind::Cycle => write!(f, "Cycle"),
            ResourceKind::Label => write!(f, "Label"),
            ResourceKind::Comment => write!(f, "Comment"),
            ResourceKind::Document => write!(f, "Document"),
        }
    }
}

/// Work item priority as the API spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
    #[default]
    None,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Urgent => write!(f, "urgent"),
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
            Priority::None => write!(f, "none"),
        }
    }
}

impl FromStr for Priority {
    type Err = PlaneError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "urgent" => Ok(Priority::Urgent),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            "none" => Ok(Priority::None),
            _ => Err(PlaneError::validation(
                format!("Invalid priority: {}", s),
                "Use one of: urgent, high, medium, low, none.",
            )),
        }
    }
}
