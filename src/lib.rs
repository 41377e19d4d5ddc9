#![allow(clippy::new_without_default)]

pub mod approvers;
pub mod config;
pub mod github;
pub mod handlers;
pub mod logger;
pub mod owners;
