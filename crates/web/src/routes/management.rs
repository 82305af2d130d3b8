//! Management route handlers: suppliers and departments.
//!
//! The management page also lists categories, which are edited through the
//! categories routes.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use pharmacy_core::{DepartmentId, Page, SupplierId};

use crate::db::{CategoryRepository, DepartmentRepository, SupplierRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{Authorized, area, verify_csrf};
use crate::models::{
    CategoryListing, Department, DepartmentFields, Supplier, SupplierFields,
};
use crate::routes::page::{CsrfForm, Done, Layout, checked, conclude};
use crate::services::registry::Registry;
use crate::state::AppState;

const MANAGEMENT: &str = "/management";

// =============================================================================
// Form Types
// =============================================================================

/// Supplier create/update form data.
#[derive(Debug, Deserialize)]
pub struct SupplierForm {
    pub csrf_token: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<String>,
}

impl SupplierForm {
    fn fields(&self, creating: bool) -> SupplierFields {
        SupplierFields {
            name: self.name.clone(),
            contact_person: self.contact_person.clone(),
            contact_phone: self.contact_phone.clone(),
            email: self.email.clone(),
            address: self.address.clone(),
            is_active: creating || checked(self.is_active.as_ref()),
        }
    }
}

/// Department create/update form data.
#[derive(Debug, Deserialize)]
pub struct DepartmentForm {
    pub csrf_token: String,
    pub name: String,
    pub location: Option<String>,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub is_active: Option<String>,
}

impl DepartmentForm {
    fn fields(&self, creating: bool) -> DepartmentFields {
        DepartmentFields {
            name: self.name.clone(),
            location: self.location.clone(),
            contact_person: self.contact_person.clone(),
            contact_phone: self.contact_phone.clone(),
            is_active: creating || checked(self.is_active.as_ref()),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Management page template.
#[derive(Template, WebTemplate)]
#[template(path = "management/index.html")]
pub struct ManagementTemplate {
    pub layout: Layout,
    pub suppliers: Vec<Supplier>,
    pub departments: Vec<Department>,
    pub categories: Vec<CategoryListing>,
}

/// Supplier edit page template.
#[derive(Template, WebTemplate)]
#[template(path = "management/supplier.html")]
pub struct SupplierEditTemplate {
    pub layout: Layout,
    pub supplier: Supplier,
}

/// Department edit page template.
#[derive(Template, WebTemplate)]
#[template(path = "management/department.html")]
pub struct DepartmentEditTemplate {
    pub layout: Layout,
    pub department: Department,
}

/// Suppliers, departments and categories.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    auth: Authorized<area::Management>,
) -> Result<ManagementTemplate> {
    let pool = state.pool();
    Ok(ManagementTemplate {
        layout: Layout::new(&auth, Page::Management, "Management").await?,
        suppliers: SupplierRepository::new(pool).list().await?,
        departments: DepartmentRepository::new(pool).list().await?,
        categories: CategoryRepository::new(pool).list_with_usage().await?,
    })
}

// =============================================================================
// Suppliers
// =============================================================================

/// Show the edit form for one supplier.
pub async fn edit_supplier(
    State(state): State<AppState>,
    auth: Authorized<area::Management>,
    Path(id): Path<SupplierId>,
) -> Result<SupplierEditTemplate> {
    let supplier = SupplierRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("supplier {id}")))?;

    Ok(SupplierEditTemplate {
        layout: Layout::new(&auth, Page::Management, "Edit Supplier").await?,
        supplier,
    })
}

/// Add a supplier.
#[instrument(skip_all, fields(user = %auth.user.username))]
pub async fn create_supplier(
    State(state): State<AppState>,
    auth: Authorized<area::Management>,
    Form(form): Form<SupplierForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = Registry::new(state.pool())
        .create_supplier(form.fields(true))
        .await
        .map(|s| {
            Done::new(
                "supplier_create",
                format!("supplier {} ({})", s.id, s.name),
                "Supplier added successfully.",
            )
        });
    Ok(conclude(&state, &auth, outcome, MANAGEMENT, MANAGEMENT).await)
}

/// Update a supplier.
#[instrument(skip_all, fields(user = %auth.user.username, supplier_id = %id))]
pub async fn update_supplier(
    State(state): State<AppState>,
    auth: Authorized<area::Management>,
    Path(id): Path<SupplierId>,
    Form(form): Form<SupplierForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = Registry::new(state.pool())
        .update_supplier(id, form.fields(false))
        .await
        .map(|s| {
            Done::new(
                "supplier_update",
                format!("supplier {} ({})", s.id, s.name),
                "Supplier updated successfully.",
            )
        });
    let back = format!("/management/suppliers/{id}");
    Ok(conclude(&state, &auth, outcome, MANAGEMENT, &back).await)
}

/// Delete a supplier with no purchases.
#[instrument(skip_all, fields(user = %auth.user.username, supplier_id = %id))]
pub async fn delete_supplier(
    State(state): State<AppState>,
    auth: Authorized<area::Management>,
    Path(id): Path<SupplierId>,
    Form(form): Form<CsrfForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = Registry::new(state.pool())
        .delete_supplier(id)
        .await
        .map(|()| {
            Done::new(
                "supplier_delete",
                format!("supplier {id}"),
                "Supplier deleted successfully.",
            )
        });
    Ok(conclude(&state, &auth, outcome, MANAGEMENT, MANAGEMENT).await)
}

// =============================================================================
// Departments
// =============================================================================

/// Show the edit form for one department.
pub async fn edit_department(
    State(state): State<AppState>,
    auth: Authorized<area::Management>,
    Path(id): Path<DepartmentId>,
) -> Result<DepartmentEditTemplate> {
    let department = DepartmentRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("department {id}")))?;

    Ok(DepartmentEditTemplate {
        layout: Layout::new(&auth, Page::Management, "Edit Department").await?,
        department,
    })
}

/// Add a department.
#[instrument(skip_all, fields(user = %auth.user.username))]
pub async fn create_department(
    State(state): State<AppState>,
    auth: Authorized<area::Management>,
    Form(form): Form<DepartmentForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = Registry::new(state.pool())
        .create_department(form.fields(true))
        .await
        .map(|d| {
            Done::new(
                "department_create",
                format!("department {} ({})", d.id, d.name),
                "Department added successfully.",
            )
        });
    Ok(conclude(&state, &auth, outcome, MANAGEMENT, MANAGEMENT).await)
}

/// Update a department.
#[instrument(skip_all, fields(user = %auth.user.username, department_id = %id))]
pub async fn update_department(
    State(state): State<AppState>,
    auth: Authorized<area::Management>,
    Path(id): Path<DepartmentId>,
    Form(form): Form<DepartmentForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = Registry::new(state.pool())
        .update_department(id, form.fields(false))
        .await
        .map(|d| {
            Done::new(
                "department_update",
                format!("department {} ({})", d.id, d.name),
                "Department updated successfully.",
            )
        });
    let back = format!("/management/departments/{id}");
    Ok(conclude(&state, &auth, outcome, MANAGEMENT, &back).await)
}

/// Delete a department nothing references.
#[instrument(skip_all, fields(user = %auth.user.username, department_id = %id))]
pub async fn delete_department(
    State(state): State<AppState>,
    auth: Authorized<area::Management>,
    Path(id): Path<DepartmentId>,
    Form(form): Form<CsrfForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = Registry::new(state.pool())
        .delete_department(id)
        .await
        .map(|()| {
            Done::new(
                "department_delete",
                format!("department {id}"),
                "Department deleted successfully.",
            )
        });
    Ok(conclude(&state, &auth, outcome, MANAGEMENT, MANAGEMENT).await)
}
