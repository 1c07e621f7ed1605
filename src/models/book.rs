//! Bibliographic record and physical copy types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Circulation status of a physical copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CopyStatus {
    Available,
    Borrowed,
    Maintenance,
    Lost,
}

impl CopyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyStatus::Available => "AVAILABLE",
            CopyStatus::Borrowed => "BORROWED",
            CopyStatus::Maintenance => "MAINTENANCE",
            CopyStatus::Lost => "LOST",
        }
    }
}

impl std::fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CopyStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(CopyStatus::Available),
            "BORROWED" => Ok(CopyStatus::Borrowed),
            "MAINTENANCE" => Ok(CopyStatus::Maintenance),
            "LOST" => Ok(CopyStatus::Lost),
            other => Err(AppError::Internal(format!("Unknown copy status '{}'", other))),
        }
    }
}

/// Catalogued book (bibliographic record)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
}

/// A specific physical instance of a book, identified by its QR code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookCopy {
    pub id: i64,
    pub book: Book,
    pub qr_code: String,
    pub library: String,
    pub shelf_location: Option<String>,
    pub status: CopyStatus,
}

/// Minimal copy lookup used when borrowing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyAvailability {
    pub id: i64,
    pub status: CopyStatus,
}

/// How a caller identifies the copy to borrow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyRef {
    QrCode(String),
    Id(i64),
}

impl std::fmt::Display for CopyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CopyRef::QrCode(code) => write!(f, "QR code {}", code),
            CopyRef::Id(id) => write!(f, "id {}", id),
        }
    }
}
