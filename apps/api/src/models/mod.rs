pub mod collaborator;
pub mod job;
pub mod ranking;
pub mod skill;
