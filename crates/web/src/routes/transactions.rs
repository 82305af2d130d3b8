//! Transaction route handlers: weekly summary, recording and reversal.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::instrument;

use pharmacy_core::{DepartmentId, DrugId, Page, TransactionId, TransactionType, UserId};

use crate::db::{DepartmentRepository, DrugRepository, TransactionRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::{Authorized, area, verify_csrf};
use crate::models::{Department, Drug, TransactionListing, WeeklySummary};
use crate::routes::inventory::{describe, ledger};
use crate::routes::page::{self, CsrfForm, Done, Layout, conclude, text};
use crate::services::ServiceError;
use crate::services::ledger::Dispense;
use crate::state::AppState;

/// Transactions listed on the page.
const RECENT_LIMIT: i64 = 100;

/// Record transaction form data.
#[derive(Debug, Deserialize)]
pub struct RecordForm {
    pub csrf_token: String,
    pub transaction_type: String,
    pub drug_id: String,
    pub department_id: String,
    pub quantity: String,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
}

impl RecordForm {
    fn parse(&self) -> std::result::Result<(TransactionType, Dispense), ServiceError> {
        let kind = self
            .transaction_type
            .parse::<TransactionType>()
            .ok()
            .filter(|t| TransactionType::RECORDABLE.contains(t))
            .ok_or_else(|| ServiceError::validation("Invalid transaction type."))?;

        let request = Dispense {
            drug_id: page::required_id::<DrugId>(&self.drug_id, "drug")?,
            department_id: page::required_id::<DepartmentId>(&self.department_id, "department")?,
            quantity: page::integer(&self.quantity, "Quantity")?,
            reference_number: text(self.reference_number.clone()),
            notes: text(self.notes.clone()),
        };
        Ok((kind, request))
    }
}

/// Transactions page template.
#[derive(Template, WebTemplate)]
#[template(path = "transactions/index.html")]
pub struct TransactionsTemplate {
    pub layout: Layout,
    pub summary: WeeklySummary,
    pub transactions: Vec<TransactionListing>,
    pub drugs: Vec<Drug>,
    pub departments: Vec<Department>,
    pub recordable: [TransactionType; 3],
}

/// Weekly summary, recent transactions and the record form.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    auth: Authorized<area::Transactions>,
) -> Result<TransactionsTemplate> {
    let pool = state.pool();
    let repo = TransactionRepository::new(pool);
    let week_ago = Utc::now() - Duration::days(7);

    Ok(TransactionsTemplate {
        layout: Layout::new(&auth, Page::Transactions, "Transactions").await?,
        summary: repo.summary_since(week_ago).await?,
        transactions: repo.recent(RECENT_LIMIT).await?,
        drugs: DrugRepository::new(pool).list_active().await?,
        departments: DepartmentRepository::new(pool).list_active().await?,
        recordable: TransactionType::RECORDABLE,
    })
}

/// Record a sale, return or issue.
#[instrument(skip_all, fields(user = %auth.user.username, kind = %form.transaction_type))]
pub async fn record(
    State(state): State<AppState>,
    auth: Authorized<area::Transactions>,
    Form(form): Form<RecordForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = apply_record(&state, auth.user.id, &form).await;
    Ok(conclude(&state, &auth, outcome, "/transactions", "/transactions").await)
}

async fn apply_record(
    state: &AppState,
    actor: UserId,
    form: &RecordForm,
) -> std::result::Result<Done, ServiceError> {
    let (kind, request) = form.parse()?;
    let ledger = ledger(state);
    let receipt = match kind {
        TransactionType::Sale => ledger.record_sale(actor, &request).await?,
        TransactionType::Return => ledger.record_return(actor, &request).await?,
        _ => ledger.record_issue(actor, &request).await?,
    };

    let reference = request.reference_number.as_deref().unwrap_or("none");
    Ok(Done::new(
        "transaction_record",
        describe(&receipt, &format!("reference {reference}")),
        format!("{} recorded successfully.", kind.label()),
    ))
}

/// Reverse a transaction and delete it.
#[instrument(skip_all, fields(user = %auth.user.username, transaction_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    auth: Authorized<area::Transactions>,
    Path(id): Path<TransactionId>,
    Form(form): Form<CsrfForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = apply_reversal(&state, auth.user.id, id).await;
    Ok(conclude(&state, &auth, outcome, "/transactions", "/transactions").await)
}

async fn apply_reversal(
    state: &AppState,
    actor: UserId,
    id: TransactionId,
) -> std::result::Result<Done, ServiceError> {
    let reversal = ledger(state).reverse(actor, id).await?;
    let tx = &reversal.transaction;
    Ok(Done::new(
        "transaction_delete",
        format!(
            "transaction {} ({}): drug {}, quantity {}, {} batch(es) restored",
            tx.id,
            tx.transaction_type,
            tx.drug_id,
            tx.quantity,
            reversal.movements.len()
        ),
        "Transaction deleted and stock restored.",
    ))
}
