use serde::Deserialize;

use crate::error::{Error, Result};

/// A registered freelancer profile as stored on the ledger table.
#[derive(Debug, Clone, Deserialize)]
pub struct Freelancer {
    pub id: i64,
    pub wallet_address: String,
    pub full_name: String,
    pub email: String,
    #[serde(deserialize_with = "skills_from_column")]
    pub skills: Vec<String>,
    pub experience: String,
    pub hourly_rate: f64,
    pub portfolio: String,
    pub bio: String,
    pub timestamp: i64,
}

/// Registration input; `id` and `timestamp` are assigned at insert time.
#[derive(Debug, Clone)]
pub struct NewFreelancer {
    pub wallet_address: String,
    pub full_name: String,
    pub email: String,
    pub skills: Vec<String>,
    pub experience: String,
    pub hourly_rate: f64,
    pub portfolio: String,
    pub bio: String,
}

/// Join the skill list into the single text column.
///
/// An entry containing the delimiter itself would corrupt the round trip,
/// so it is rejected here instead of silently splitting on the way out.
pub fn encode_skills(skills: &[String]) -> Result<String> {
    for skill in skills {
        if skill.contains(',') {
            return Err(Error::SkillDelimiter(skill.clone()));
        }
    }
    Ok(skills.join(","))
}

/// Split the text column back into the ordered, trimmed skill list.
pub fn decode_skills(raw: &str) -> Vec<String> {
    raw.split(',').map(|skill| skill.trim().to_string()).collect()
}

fn skills_from_column<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(decode_skills(&raw))
}
