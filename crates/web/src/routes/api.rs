//! JSON endpoints used by page scripts.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use pharmacy_core::{DepartmentId, DrugId};

use crate::db::InventoryRepository;
use crate::error::Result;
use crate::middleware::Authenticated;
use crate::state::AppState;

/// Stock lookup parameters.
#[derive(Debug, Deserialize)]
pub struct StockQuery {
    pub drug_id: DrugId,
    pub department_id: DepartmentId,
}

/// On-hand total for a drug at a department.
#[derive(Debug, Serialize)]
pub struct StockResponse {
    pub stock: i64,
}

/// Total on-hand stock of a drug at a department.
pub async fn stock(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<StockQuery>,
) -> Result<Json<StockResponse>> {
    let stock = InventoryRepository::new(state.pool())
        .stock_total(query.drug_id, query.department_id)
        .await?;
    Ok(Json(StockResponse { stock }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_response_shape() {
        let body = serde_json::to_value(StockResponse { stock: 42 }).unwrap();
        assert_eq!(body, serde_json::json!({ "stock": 42 }));
    }
}
