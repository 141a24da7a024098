// Private submission moderation - queue, decisions, publication.
// Following the same pattern as the mutes module.

pub mod submission_models;
pub mod submission_registry;
pub mod submission_service;

pub use submission_models::*;
pub use submission_registry::*;
pub use submission_service::*;
