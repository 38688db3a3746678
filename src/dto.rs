//! Data transfer objects shared by the web and service layers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Sample record returned by the service layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SampleRecord {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Sample")]
    pub name: String,
    #[schema(example = "Sample data from service layer")]
    pub description: String,
}
