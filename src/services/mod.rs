//! Business logic services

pub mod clock;
pub mod email;
pub mod inflight;
pub mod loans;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub loans: loans::LoansService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> AppResult<Self> {
        let policy = config
            .policy()
            .map_err(|e| AppError::Internal(format!("Invalid circulation settings: {}", e)))?;

        Ok(Self {
            loans: loans::LoansService::new(
                Arc::new(repository.loans),
                Arc::new(email::EmailService::new(config.email.clone())),
                policy,
                Arc::new(clock::SystemClock),
            ),
        })
    }
}
