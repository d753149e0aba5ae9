//! Core data models for the inhouse stats service.

mod achievement;
mod aggregate;
mod ids;
mod match_record;
mod queue;
mod user;

pub use achievement::*;
pub use aggregate::*;
pub use ids::*;
pub use match_record::*;
pub use queue::*;
pub use user::*;
