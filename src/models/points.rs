use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PointsBalanceResponse {
    pub user_id: i64,
    pub points: i64,
}
