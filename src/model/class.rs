use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Class {
    #[schema(example = "class-1")]
    pub id: String,
    #[schema(example = "Class 10-A")]
    pub name: String,
}
