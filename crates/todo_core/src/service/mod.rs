//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate record store calls into use-case level APIs.
//! - Map storage outcomes into the closed domain error taxonomy.

pub mod todo_service;
