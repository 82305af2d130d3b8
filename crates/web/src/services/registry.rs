//! Reference data: categories, suppliers, departments and drugs.
//!
//! Input is trimmed and checked here before it reaches the repositories.
//! Deletes refuse while other records still point at the row.

use sqlx::PgPool;
use tracing::instrument;

use pharmacy_core::{CategoryId, DepartmentId, DrugId, Email, SupplierId};

use crate::db::categories::CATEGORY_IN_USE;
use crate::db::departments::DEPARTMENT_IN_USE;
use crate::db::suppliers::SUPPLIER_IN_USE;
use crate::db::{CategoryRepository, DepartmentRepository, DrugRepository, SupplierRepository};
use crate::models::{
    Category, CategoryFields, Department, DepartmentFields, Drug, DrugFields, Supplier,
    SupplierFields,
};
use crate::services::ServiceError;

/// Shown when deactivating a drug that still has batches.
pub const DRUG_HAS_INVENTORY: &str = "Cannot delete drug with existing inventory.";

/// Service over the reference-data repositories.
pub struct Registry<'a> {
    pool: &'a PgPool,
}

impl<'a> Registry<'a> {
    /// Create a registry service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank name and `Conflict` for a duplicate.
    pub async fn create_category(&self, fields: CategoryFields) -> Result<Category, ServiceError> {
        let fields = clean_category(fields)?;
        Ok(CategoryRepository::new(self.pool).create(&fields).await?)
    }

    /// Update a category.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank name, `NotFound` and `Conflict`.
    pub async fn update_category(
        &self,
        id: CategoryId,
        fields: CategoryFields,
    ) -> Result<Category, ServiceError> {
        let fields = clean_category(fields)?;
        Ok(CategoryRepository::new(self.pool).update(id, &fields).await?)
    }

    /// Delete a category no drug uses.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` while any drug references the category.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), ServiceError> {
        let repo = CategoryRepository::new(self.pool);
        if repo.count_drugs(id).await? > 0 {
            return Err(ServiceError::conflict(CATEGORY_IN_USE));
        }
        repo.delete(id).await?;
        Ok(())
    }

    // =========================================================================
    // Suppliers
    // =========================================================================

    /// Create a supplier.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank name or malformed email and `Conflict`
    /// for a duplicate name.
    pub async fn create_supplier(&self, fields: SupplierFields) -> Result<Supplier, ServiceError> {
        let fields = clean_supplier(fields)?;
        Ok(SupplierRepository::new(self.pool).create(&fields).await?)
    }

    /// Update a supplier.
    ///
    /// # Errors
    ///
    /// Returns `Validation`, `NotFound` and `Conflict` as for create.
    pub async fn update_supplier(
        &self,
        id: SupplierId,
        fields: SupplierFields,
    ) -> Result<Supplier, ServiceError> {
        let fields = clean_supplier(fields)?;
        Ok(SupplierRepository::new(self.pool).update(id, &fields).await?)
    }

    /// Delete a supplier with no purchases.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` while any purchase references the supplier.
    #[instrument(skip(self))]
    pub async fn delete_supplier(&self, id: SupplierId) -> Result<(), ServiceError> {
        let repo = SupplierRepository::new(self.pool);
        if repo.count_purchases(id).await? > 0 {
            return Err(ServiceError::conflict(SUPPLIER_IN_USE));
        }
        repo.delete(id).await?;
        Ok(())
    }

    // =========================================================================
    // Departments
    // =========================================================================

    /// Create a department.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank name and `Conflict` for a duplicate.
    pub async fn create_department(
        &self,
        fields: DepartmentFields,
    ) -> Result<Department, ServiceError> {
        let fields = clean_department(fields)?;
        Ok(DepartmentRepository::new(self.pool).create(&fields).await?)
    }

    /// Update a department.
    ///
    /// # Errors
    ///
    /// Returns `Validation`, `NotFound` and `Conflict` as for create.
    pub async fn update_department(
        &self,
        id: DepartmentId,
        fields: DepartmentFields,
    ) -> Result<Department, ServiceError> {
        let fields = clean_department(fields)?;
        Ok(DepartmentRepository::new(self.pool).update(id, &fields).await?)
    }

    /// Delete a department nothing references.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` while inventory, users or transactions reference it.
    #[instrument(skip(self))]
    pub async fn delete_department(&self, id: DepartmentId) -> Result<(), ServiceError> {
        let repo = DepartmentRepository::new(self.pool);
        if repo.count_references(id).await? > 0 {
            return Err(ServiceError::conflict(DEPARTMENT_IN_USE));
        }
        repo.delete(id).await?;
        Ok(())
    }

    // =========================================================================
    // Drugs
    // =========================================================================

    /// Add a drug to the formulary.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for missing fields or an unknown category and
    /// `Conflict` for a duplicate name.
    pub async fn create_drug(&self, fields: DrugFields) -> Result<Drug, ServiceError> {
        let fields = self.clean_drug(fields).await?;
        Ok(DrugRepository::new(self.pool).create(&fields).await?)
    }

    /// Update a drug.
    ///
    /// # Errors
    ///
    /// Returns `Validation`, `NotFound` and `Conflict` as for create.
    pub async fn update_drug(&self, id: DrugId, fields: DrugFields) -> Result<Drug, ServiceError> {
        let fields = self.clean_drug(fields).await?;
        Ok(DrugRepository::new(self.pool).update(id, &fields).await?)
    }

    /// Deactivate a drug that has no inventory batches.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` while any batch (even an empty one) exists.
    #[instrument(skip(self))]
    pub async fn deactivate_drug(&self, id: DrugId) -> Result<(), ServiceError> {
        let repo = DrugRepository::new(self.pool);
        if repo.count_inventory(id).await? > 0 {
            return Err(ServiceError::conflict(DRUG_HAS_INVENTORY));
        }
        repo.deactivate(id).await?;
        Ok(())
    }

    async fn clean_drug(&self, fields: DrugFields) -> Result<DrugFields, ServiceError> {
        let fields = clean_drug_fields(fields)?;
        if let Some(category) = fields.category_id
            && CategoryRepository::new(self.pool).get(category).await?.is_none()
        {
            return Err(ServiceError::validation("Selected category does not exist."));
        }
        Ok(fields)
    }
}

// =============================================================================
// Field normalization
// =============================================================================

/// Trim a required field.
fn required(value: &str, message: &str) -> Result<String, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::validation(message));
    }
    Ok(value.to_string())
}

/// Trim an optional field, treating blank as absent.
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_category(fields: CategoryFields) -> Result<CategoryFields, ServiceError> {
    Ok(CategoryFields {
        name: required(&fields.name, "Category name is required.")?,
        description: optional(fields.description),
    })
}

fn clean_supplier(fields: SupplierFields) -> Result<SupplierFields, ServiceError> {
    let email = optional(fields.email)
        .map(|raw| Email::parse(&raw).map(|e| e.as_str().to_string()))
        .transpose()
        .map_err(|e| ServiceError::validation(format!("Invalid supplier email: {e}.")))?;

    Ok(SupplierFields {
        name: required(&fields.name, "Supplier name is required.")?,
        contact_person: optional(fields.contact_person),
        contact_phone: optional(fields.contact_phone),
        email,
        address: optional(fields.address),
        is_active: fields.is_active,
    })
}

fn clean_department(fields: DepartmentFields) -> Result<DepartmentFields, ServiceError> {
    Ok(DepartmentFields {
        name: required(&fields.name, "Department name is required.")?,
        location: optional(fields.location),
        contact_person: optional(fields.contact_person),
        contact_phone: optional(fields.contact_phone),
        is_active: fields.is_active,
    })
}

fn clean_drug_fields(fields: DrugFields) -> Result<DrugFields, ServiceError> {
    if fields.reorder_level < 0 {
        return Err(ServiceError::validation("Reorder level cannot be negative."));
    }
    Ok(DrugFields {
        name: required(&fields.name, "Drug name is required.")?,
        generic_name: optional(fields.generic_name),
        category_id: fields.category_id,
        unit_of_measure: required(&fields.unit_of_measure, "Unit of measure is required.")?,
        reorder_level: fields.reorder_level,
        description: optional(fields.description),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn drug_fields(name: &str, unit: &str, reorder_level: i32) -> DrugFields {
        DrugFields {
            name: name.to_string(),
            generic_name: Some("  ".to_string()),
            category_id: None,
            unit_of_measure: unit.to_string(),
            reorder_level,
            description: Some(" Analgesic ".to_string()),
        }
    }

    #[test]
    fn test_drug_fields_are_trimmed() {
        let fields = clean_drug_fields(drug_fields("  Paracetamol ", "tablet", 20)).unwrap();
        assert_eq!(fields.name, "Paracetamol");
        assert_eq!(fields.generic_name, None);
        assert_eq!(fields.description.as_deref(), Some("Analgesic"));
    }

    #[test]
    fn test_drug_fields_require_name_and_unit() {
        assert!(matches!(
            clean_drug_fields(drug_fields(" ", "tablet", 0)).unwrap_err(),
            ServiceError::Validation(_)
        ));
        assert!(matches!(
            clean_drug_fields(drug_fields("Ibuprofen", "", 0)).unwrap_err(),
            ServiceError::Validation(_)
        ));
        assert!(clean_drug_fields(drug_fields("Ibuprofen", "tablet", -1)).is_err());
    }

    #[test]
    fn test_supplier_email_is_validated_and_normalized() {
        let fields = SupplierFields {
            name: "MedSupply".to_string(),
            contact_person: None,
            contact_phone: Some(String::new()),
            email: Some(" Orders@MedSupply.com ".to_string()),
            address: None,
            is_active: true,
        };
        let cleaned = clean_supplier(fields.clone()).unwrap();
        assert_eq!(cleaned.email.as_deref(), Some("orders@medsupply.com"));
        assert_eq!(cleaned.contact_phone, None);

        let bad = SupplierFields {
            email: Some("not-an-email".to_string()),
            ..fields
        };
        assert!(matches!(
            clean_supplier(bad).unwrap_err(),
            ServiceError::Validation(_)
        ));
    }

    #[test]
    fn test_category_and_department_names_required() {
        let category = CategoryFields {
            name: "\t".to_string(),
            description: None,
        };
        assert!(clean_category(category).is_err());

        let department = DepartmentFields {
            name: " ER Ward ".to_string(),
            location: Some("Block B".to_string()),
            contact_person: None,
            contact_phone: None,
            is_active: true,
        };
        assert_eq!(clean_department(department).unwrap().name, "ER Ward");
    }
}
