mod freelancer;
mod milestone;
mod project;

pub use freelancer::{Freelancer, NewFreelancer, decode_skills, encode_skills};
pub use milestone::{Milestone, decode_milestones, encode_milestones};
pub use project::{NewProject, Project, ProjectStatus};
