//! Inventory route handlers: batch listing, restock, adjust and transfer.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::Redirect,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::instrument;

use pharmacy_core::{DepartmentId, DrugId, InventoryId, Page, SupplierId, UserId};

use crate::db::{DepartmentRepository, DrugRepository, InventoryRepository, SupplierRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::{Authorized, area, verify_csrf};
use crate::models::{Department, Drug, InventoryListing, Supplier};
use crate::routes::page::{self, Done, Layout, conclude, text};
use crate::services::ServiceError;
use crate::services::ledger::{Adjustment, Ledger, LedgerReceipt, Restock, Transfer};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Inventory list filters.
#[derive(Debug, Deserialize)]
pub struct InventoryQuery {
    #[serde(default)]
    pub department_id: String,
}

/// Restock form data.
#[derive(Debug, Deserialize)]
pub struct RestockForm {
    pub csrf_token: String,
    pub drug_id: String,
    pub department_id: String,
    pub supplier_id: String,
    pub quantity: String,
    pub batch_number: String,
    pub expiry_date: String,
    pub unit_price: String,
    pub notes: Option<String>,
}

impl RestockForm {
    fn request(&self) -> std::result::Result<Restock, ServiceError> {
        Ok(Restock {
            drug_id: page::required_id::<DrugId>(&self.drug_id, "drug")?,
            department_id: page::required_id::<DepartmentId>(&self.department_id, "department")?,
            supplier_id: page::required_id::<SupplierId>(&self.supplier_id, "supplier")?,
            quantity: page::integer(&self.quantity, "Quantity")?,
            batch_number: self.batch_number.trim().to_string(),
            expiry_date: page::date(&self.expiry_date, "Expiry date")?,
            unit_price: page::decimal(&self.unit_price, "Unit price")?,
            notes: text(self.notes.clone()),
        })
    }
}

/// Adjustment form data.
#[derive(Debug, Deserialize)]
pub struct AdjustForm {
    pub csrf_token: String,
    pub inventory_id: String,
    pub quantity_change: String,
    #[serde(default)]
    pub new_expiry_date: String,
    pub notes: Option<String>,
}

impl AdjustForm {
    fn request(&self) -> std::result::Result<Adjustment, ServiceError> {
        Ok(Adjustment {
            inventory_id: page::required_id::<InventoryId>(&self.inventory_id, "batch")?,
            delta: page::integer(&self.quantity_change, "Quantity change")?,
            notes: text(self.notes.clone()),
            new_expiry: page::optional_date(&self.new_expiry_date, "New expiry date")?,
        })
    }
}

/// Transfer form data.
#[derive(Debug, Deserialize)]
pub struct TransferForm {
    pub csrf_token: String,
    pub inventory_id: String,
    pub quantity: String,
    pub to_department_id: String,
    pub notes: Option<String>,
}

impl TransferForm {
    fn request(&self) -> std::result::Result<Transfer, ServiceError> {
        Ok(Transfer {
            inventory_id: page::required_id::<InventoryId>(&self.inventory_id, "batch")?,
            quantity: page::integer(&self.quantity, "Quantity")?,
            to_department: page::required_id::<DepartmentId>(
                &self.to_department_id,
                "destination department",
            )?,
            notes: text(self.notes.clone()),
        })
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Inventory page template.
#[derive(Template, WebTemplate)]
#[template(path = "inventory/index.html")]
pub struct InventoryTemplate {
    pub layout: Layout,
    pub batches: Vec<InventoryListing>,
    pub drugs: Vec<Drug>,
    pub departments: Vec<Department>,
    pub suppliers: Vec<Supplier>,
    pub selected_department: Option<DepartmentId>,
    pub low_stock_count: usize,
    pub expiring_count: usize,
    pub expiry_warning_days: i32,
    /// Earliest expiry date a restock accepts.
    pub min_restock_expiry: NaiveDate,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
impl InventoryTemplate {
    fn is_selected(&self, department: &DepartmentId) -> bool {
        self.selected_department == Some(*department)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// List batches, optionally for one department.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    auth: Authorized<area::Inventory>,
    Query(query): Query<InventoryQuery>,
) -> Result<InventoryTemplate> {
    let pool = state.pool();
    let today = Utc::now().date_naive();
    let warning_days = state.config().expiry_warning_days;
    let selected_department =
        page::optional_id::<DepartmentId>(&query.department_id, "department").unwrap_or(None);

    let batches = InventoryRepository::new(pool)
        .list(today, selected_department)
        .await?;
    let low_stock_count = batches.iter().filter(|b| b.is_low_stock()).count();
    let expiring_count = batches
        .iter()
        .filter(|b| b.quantity > 0 && b.expires_within(&warning_days))
        .count();

    Ok(InventoryTemplate {
        layout: Layout::new(&auth, Page::Inventory, "Inventory").await?,
        batches,
        drugs: DrugRepository::new(pool).list_active().await?,
        departments: DepartmentRepository::new(pool).list_active().await?,
        suppliers: SupplierRepository::new(pool).list_active().await?,
        selected_department,
        low_stock_count,
        expiring_count,
        expiry_warning_days: warning_days,
        min_restock_expiry: state.config().ledger.restock_min_expiry(today),
    })
}

/// Receive stock from a supplier.
#[instrument(skip_all, fields(user = %auth.user.username))]
pub async fn restock(
    State(state): State<AppState>,
    auth: Authorized<area::Inventory>,
    Form(form): Form<RestockForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = apply_restock(&state, auth.user.id, &form).await;
    Ok(conclude(&state, &auth, outcome, "/inventory", "/inventory").await)
}

async fn apply_restock(
    state: &AppState,
    actor: UserId,
    form: &RestockForm,
) -> std::result::Result<Done, ServiceError> {
    let request = form.request()?;
    let receipt = ledger(state).restock(actor, &request).await?;
    Ok(Done::new(
        "stock_restock",
        describe(&receipt, &format!("batch {}", request.batch_number)),
        "Stock received successfully.",
    ))
}

/// Correct the quantity of a batch.
#[instrument(skip_all, fields(user = %auth.user.username))]
pub async fn adjust(
    State(state): State<AppState>,
    auth: Authorized<area::Inventory>,
    Form(form): Form<AdjustForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = apply_adjustment(&state, auth.user.id, &form).await;
    Ok(conclude(&state, &auth, outcome, "/inventory", "/inventory").await)
}

async fn apply_adjustment(
    state: &AppState,
    actor: UserId,
    form: &AdjustForm,
) -> std::result::Result<Done, ServiceError> {
    let request = form.request()?;
    let receipt = ledger(state).adjust(actor, &request).await?;
    Ok(Done::new(
        "stock_adjust",
        describe(&receipt, &format!("change {:+}", request.delta)),
        "Stock adjusted successfully.",
    ))
}

/// Move stock to another department.
#[instrument(skip_all, fields(user = %auth.user.username))]
pub async fn transfer(
    State(state): State<AppState>,
    auth: Authorized<area::Inventory>,
    Form(form): Form<TransferForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = apply_transfer(&state, auth.user.id, &form).await;
    Ok(conclude(&state, &auth, outcome, "/inventory", "/inventory").await)
}

async fn apply_transfer(
    state: &AppState,
    actor: UserId,
    form: &TransferForm,
) -> std::result::Result<Done, ServiceError> {
    let request = form.request()?;
    let receipt = ledger(state).transfer(actor, &request).await?;
    Ok(Done::new(
        "stock_transfer",
        describe(&receipt, &format!("to department {}", request.to_department)),
        "Stock transferred successfully.",
    ))
}

pub(crate) fn ledger(state: &AppState) -> Ledger<'_> {
    Ledger::new(state.pool(), state.config().ledger)
}

/// Activity log details for a ledger receipt.
pub(crate) fn describe(receipt: &LedgerReceipt, extra: &str) -> String {
    let tx = &receipt.transaction;
    format!(
        "transaction {} ({}): drug {}, department {}, quantity {}, {extra}",
        tx.id, tx.transaction_type, tx.drug_id, tx.department_id, tx.quantity
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn department(id: i32, name: &str) -> Department {
        Department {
            id: DepartmentId::new(id),
            name: name.to_string(),
            location: None,
            contact_person: None,
            contact_phone: None,
            is_active: true,
        }
    }

    fn listing(id: i32, batch: &str, days_until_expiry: i32) -> InventoryListing {
        InventoryListing {
            id: InventoryId::new(id),
            drug_id: DrugId::new(1),
            drug_name: "Paracetamol".to_string(),
            unit_of_measure: "tablet".to_string(),
            reorder_level: 10,
            department_id: DepartmentId::new(1),
            department_name: "Pharmacy".to_string(),
            quantity: 40,
            batch_number: Some(batch.to_string()),
            expiry_date: None,
            last_restocked: None,
            days_until_expiry: Some(days_until_expiry),
        }
    }

    #[test]
    fn test_index_marks_filter_and_expiring_batches() {
        let page = InventoryTemplate {
            layout: Layout::sample(Page::Inventory, "Inventory"),
            batches: vec![listing(1, "B-SOON", 5), listing(2, "B-LATER", 200)],
            drugs: Vec::new(),
            departments: vec![department(1, "Pharmacy"), department(2, "Ward A")],
            suppliers: Vec::new(),
            selected_department: Some(DepartmentId::new(2)),
            low_stock_count: 0,
            expiring_count: 1,
            expiry_warning_days: 30,
            min_restock_expiry: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
        };

        let html = page.render().unwrap();
        assert!(html.contains(r#"<option value="2" selected>Ward A</option>"#));
        assert_eq!(html.matches(r#"<tr class="expiring">"#).count(), 1);
        assert_eq!(html.matches(r#"<span class="tag warn">expiring</span>"#).count(), 1);
    }
}
