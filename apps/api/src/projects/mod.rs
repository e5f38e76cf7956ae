pub mod github;
pub mod handlers;
