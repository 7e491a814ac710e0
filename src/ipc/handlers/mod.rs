pub mod activity;
pub mod assignments;
pub mod attendance;
pub mod auth;
pub mod camera;
pub mod core;
pub mod recognition;
pub mod students;
