//! University library circulation server
//!
//! Borrowing policy (overdue days, fines, legal loan transitions) and the
//! REST JSON API built around it: borrowing, returns, fine settlement and
//! overdue reminders.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod policy;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult, PolicyError};
pub use policy::BorrowingPolicy;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
