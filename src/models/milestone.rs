use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One entry in a project's milestone plan.
///
/// Milestones are addressed by position within the list, so the order of
/// the encoded list is significant and must survive a round trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub name: String,
    pub amount: String,
    pub completed: bool,
}

/// Encode an ordered milestone list into the JSON text column form.
pub fn encode_milestones(milestones: &[Milestone]) -> Result<String> {
    Ok(serde_json::to_string(milestones)?)
}

/// Decode the JSON text column back into the ordered milestone list.
pub fn decode_milestones(raw: &str) -> Result<Vec<Milestone>> {
    Ok(serde_json::from_str(raw)?)
}
