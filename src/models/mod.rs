//! Data models for circulation

pub mod book;
pub mod loan;
pub mod money;
pub mod reader;
pub mod requests;

// Re-export commonly used types
pub use book::{Book, BookCopy, CopyStatus};
pub use loan::{Loan, LoanDetails, LoanRecord, LoanStatus};
pub use reader::Reader;
