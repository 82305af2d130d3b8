//! Drug formulary route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use pharmacy_core::{CategoryId, DrugId, Page};

use crate::db::{CategoryRepository, DrugRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{Authorized, area, verify_csrf};
use crate::models::{Category, Drug, DrugFields, DrugListing};
use crate::routes::page::{self, CsrfForm, Done, Layout, conclude};
use crate::services::ServiceError;
use crate::services::registry::Registry;
use crate::state::AppState;

/// Drug create/update form data.
#[derive(Debug, Deserialize)]
pub struct DrugForm {
    pub csrf_token: String,
    pub name: String,
    pub generic_name: Option<String>,
    #[serde(default)]
    pub category_id: String,
    pub unit_of_measure: String,
    #[serde(default)]
    pub reorder_level: String,
    pub description: Option<String>,
}

impl DrugForm {
    fn fields(&self) -> std::result::Result<DrugFields, ServiceError> {
        let reorder_level = if self.reorder_level.trim().is_empty() {
            0
        } else {
            page::integer(&self.reorder_level, "Reorder level")?
        };
        Ok(DrugFields {
            name: self.name.clone(),
            generic_name: self.generic_name.clone(),
            category_id: page::optional_id::<CategoryId>(&self.category_id, "category")?,
            unit_of_measure: self.unit_of_measure.clone(),
            reorder_level,
            description: self.description.clone(),
        })
    }
}

/// Drug list filters.
#[derive(Debug, Deserialize)]
pub struct DrugQuery {
    #[serde(default)]
    pub inactive: bool,
}

/// Drug list page template.
#[derive(Template, WebTemplate)]
#[template(path = "drugs/index.html")]
pub struct DrugsTemplate {
    pub layout: Layout,
    pub drugs: Vec<DrugListing>,
    pub categories: Vec<Category>,
    pub show_inactive: bool,
}

/// Drug edit page template.
#[derive(Template, WebTemplate)]
#[template(path = "drugs/edit.html")]
pub struct DrugEditTemplate {
    pub layout: Layout,
    pub drug: Drug,
    pub categories: Vec<Category>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
impl DrugEditTemplate {
    fn is_selected(&self, category: &CategoryId) -> bool {
        self.drug.category_id == Some(*category)
    }
}

/// List drugs with their total stock.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    auth: Authorized<area::Drugs>,
    Query(query): Query<DrugQuery>,
) -> Result<DrugsTemplate> {
    Ok(DrugsTemplate {
        layout: Layout::new(&auth, Page::Drugs, "Drugs").await?,
        drugs: DrugRepository::new(state.pool()).list(query.inactive).await?,
        categories: CategoryRepository::new(state.pool()).list().await?,
        show_inactive: query.inactive,
    })
}

/// Show the edit form for one drug.
pub async fn edit(
    State(state): State<AppState>,
    auth: Authorized<area::Drugs>,
    Path(id): Path<DrugId>,
) -> Result<DrugEditTemplate> {
    let drug = DrugRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("drug {id}")))?;

    Ok(DrugEditTemplate {
        layout: Layout::new(&auth, Page::Drugs, "Edit Drug").await?,
        drug,
        categories: CategoryRepository::new(state.pool()).list().await?,
    })
}

/// Add a drug.
#[instrument(skip_all, fields(user = %auth.user.username))]
pub async fn create(
    State(state): State<AppState>,
    auth: Authorized<area::Drugs>,
    Form(form): Form<DrugForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = create_drug(&state, &form).await;
    Ok(conclude(&state, &auth, outcome, "/drugs", "/drugs").await)
}

async fn create_drug(state: &AppState, form: &DrugForm) -> std::result::Result<Done, ServiceError> {
    let drug = Registry::new(state.pool()).create_drug(form.fields()?).await?;
    Ok(Done::new(
        "drug_create",
        format!("drug {} ({})", drug.id, drug.name),
        "Drug added successfully.",
    ))
}

/// Update a drug.
#[instrument(skip_all, fields(user = %auth.user.username, drug_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    auth: Authorized<area::Drugs>,
    Path(id): Path<DrugId>,
    Form(form): Form<DrugForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = update_drug(&state, id, &form).await;
    Ok(conclude(&state, &auth, outcome, "/drugs", &format!("/drugs/{id}")).await)
}

async fn update_drug(
    state: &AppState,
    id: DrugId,
    form: &DrugForm,
) -> std::result::Result<Done, ServiceError> {
    let drug = Registry::new(state.pool())
        .update_drug(id, form.fields()?)
        .await?;
    Ok(Done::new(
        "drug_update",
        format!("drug {} ({})", drug.id, drug.name),
        "Drug updated successfully.",
    ))
}

/// Deactivate a drug with no inventory.
#[instrument(skip_all, fields(user = %auth.user.username, drug_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    auth: Authorized<area::Drugs>,
    Path(id): Path<DrugId>,
    Form(form): Form<CsrfForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = delete_drug(&state, id).await;
    Ok(conclude(&state, &auth, outcome, "/drugs", "/drugs").await)
}

async fn delete_drug(state: &AppState, id: DrugId) -> std::result::Result<Done, ServiceError> {
    Registry::new(state.pool()).deactivate_drug(id).await?;
    Ok(Done::new(
        "drug_delete",
        format!("drug {id}"),
        "Drug deleted successfully.",
    ))
}
