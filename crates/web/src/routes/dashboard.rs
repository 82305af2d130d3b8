//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use chrono::Utc;
use tracing::instrument;

use pharmacy_core::Page;

use crate::db::{DrugRepository, InventoryRepository, TransactionRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::{Authorized, area};
use crate::models::{InventoryListing, LowStockItem, TransactionListing};
use crate::routes::page::Layout;
use crate::state::AppState;

/// Rows shown in each dashboard panel.
const PANEL_ROWS: i64 = 5;

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/index.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub active_drugs: i64,
    pub stocked_batches: i64,
    pub low_stock: Vec<LowStockItem>,
    pub recent_transactions: Vec<TransactionListing>,
    pub expiring: Vec<InventoryListing>,
    pub expiry_warning_days: i32,
}

/// Dashboard overview.
#[instrument(skip_all, fields(user = %auth.user.username))]
pub async fn index(
    State(state): State<AppState>,
    auth: Authorized<area::Dashboard>,
) -> Result<DashboardTemplate> {
    let pool = state.pool();
    let today = Utc::now().date_naive();
    let warning_days = state.config().expiry_warning_days;
    let inventory = InventoryRepository::new(pool);

    Ok(DashboardTemplate {
        layout: Layout::new(&auth, Page::Dashboard, "Dashboard").await?,
        active_drugs: DrugRepository::new(pool).count_active().await?,
        stocked_batches: inventory.count_stocked_batches().await?,
        low_stock: inventory.low_stock(PANEL_ROWS).await?,
        recent_transactions: TransactionRepository::new(pool).recent(PANEL_ROWS).await?,
        expiring: inventory
            .expiring_within(today, warning_days, PANEL_ROWS)
            .await?,
        expiry_warning_days: warning_days,
    })
}
