//! Drafting portfolio entries from public GitHub repositories.
//! Drafts are returned to the admin for review and never persisted here.

pub mod github;
pub mod handlers;
pub mod prompts;

pub use github::GithubClient;
