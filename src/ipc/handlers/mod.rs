pub mod assessments;
pub mod auth;
pub mod core;
pub mod grades;
pub mod reports;
pub mod stats;
