//! Drug category route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use pharmacy_core::{CategoryId, Page};

use crate::db::CategoryRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{Authorized, area, verify_csrf};
use crate::models::{Category, CategoryFields, CategoryListing};
use crate::routes::page::{CsrfForm, Done, Layout, conclude};
use crate::services::registry::Registry;
use crate::state::AppState;

/// Category create/update form data.
#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub csrf_token: String,
    pub name: String,
    pub description: Option<String>,
}

impl CategoryForm {
    fn fields(&self) -> CategoryFields {
        CategoryFields {
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

/// Category list page template.
#[derive(Template, WebTemplate)]
#[template(path = "categories/index.html")]
pub struct CategoriesTemplate {
    pub layout: Layout,
    pub categories: Vec<CategoryListing>,
}

/// Category edit page template.
#[derive(Template, WebTemplate)]
#[template(path = "categories/edit.html")]
pub struct CategoryEditTemplate {
    pub layout: Layout,
    pub category: Category,
}

/// List categories with the number of drugs in each.
pub async fn index(
    State(state): State<AppState>,
    auth: Authorized<area::Categories>,
) -> Result<CategoriesTemplate> {
    Ok(CategoriesTemplate {
        layout: Layout::new(&auth, Page::Categories, "Categories").await?,
        categories: CategoryRepository::new(state.pool())
            .list_with_usage()
            .await?,
    })
}

/// Show the edit form for one category.
pub async fn edit(
    State(state): State<AppState>,
    auth: Authorized<area::Categories>,
    Path(id): Path<CategoryId>,
) -> Result<CategoryEditTemplate> {
    let category = CategoryRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {id}")))?;

    Ok(CategoryEditTemplate {
        layout: Layout::new(&auth, Page::Categories, "Edit Category").await?,
        category,
    })
}

/// Add a category.
#[instrument(skip_all, fields(user = %auth.user.username))]
pub async fn create(
    State(state): State<AppState>,
    auth: Authorized<area::Categories>,
    Form(form): Form<CategoryForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = Registry::new(state.pool())
        .create_category(form.fields())
        .await
        .map(|c| {
            Done::new(
                "category_create",
                format!("category {} ({})", c.id, c.name),
                "Category added successfully.",
            )
        });
    Ok(conclude(&state, &auth, outcome, "/categories", "/categories").await)
}

/// Update a category.
#[instrument(skip_all, fields(user = %auth.user.username, category_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    auth: Authorized<area::Categories>,
    Path(id): Path<CategoryId>,
    Form(form): Form<CategoryForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = Registry::new(state.pool())
        .update_category(id, form.fields())
        .await
        .map(|c| {
            Done::new(
                "category_update",
                format!("category {} ({})", c.id, c.name),
                "Category updated successfully.",
            )
        });
    let back = format!("/categories/{id}");
    Ok(conclude(&state, &auth, outcome, "/categories", &back).await)
}

/// Delete a category no drug uses.
#[instrument(skip_all, fields(user = %auth.user.username, category_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    auth: Authorized<area::Categories>,
    Path(id): Path<CategoryId>,
    Form(form): Form<CsrfForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = Registry::new(state.pool())
        .delete_category(id)
        .await
        .map(|()| {
            Done::new(
                "category_delete",
                format!("category {id}"),
                "Category deleted successfully.",
            )
        });
    Ok(conclude(&state, &auth, outcome, "/categories", "/categories").await)
}
