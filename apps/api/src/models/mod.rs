pub mod application;
pub mod challenge;
pub mod document;
pub mod project;
pub mod submission;
pub mod user;
pub mod visit;
