use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Milestone, decode_milestones};

/// Lifecycle state of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    /// The lowercase text form stored in the status column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Pending => "pending",
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ProjectStatus::Pending),
            "active" => Ok(ProjectStatus::Active),
            "completed" => Ok(ProjectStatus::Completed),
            "cancelled" => Ok(ProjectStatus::Cancelled),
            other => Err(Error::Status(other.to_string())),
        }
    }
}

/// A project row as stored on the ledger table.
///
/// The milestones column stays in its serialized form; list reads hand it
/// back untouched and callers decode it on demand with
/// [`Project::milestones`].
#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: i64,
    pub client_address: String,
    pub freelancer_address: String,
    pub title: String,
    pub description: String,
    pub budget: f64,
    pub timeline: i64,
    pub milestones: String,
    pub status: ProjectStatus,
    pub timestamp: i64,
}

impl Project {
    /// Decode the milestones column into the ordered milestone list.
    pub fn milestones(&self) -> Result<Vec<Milestone>> {
        decode_milestones(&self.milestones)
    }
}

/// Creation input; `id` and `timestamp` are assigned at insert time.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub client_address: String,
    pub freelancer_address: String,
    pub title: String,
    pub description: String,
    pub budget: f64,
    pub timeline: i64,
    pub milestones: Vec<Milestone>,
    pub status: ProjectStatus,
}
