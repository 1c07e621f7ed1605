//! Reader (borrower) model

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Library reader as seen by circulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reader {
    pub id: i64,
    pub name: String,
    pub student_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub faculty: Option<String>,
    pub major: Option<String>,
    /// Year of study
    pub year: Option<i16>,
    pub campus: Option<String>,
}
