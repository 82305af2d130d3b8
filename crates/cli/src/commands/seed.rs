//! Seed reference data from a YAML file.
//!
//! ```yaml
//! categories:
//!   - name: Antibiotics
//!     description: Antibacterial agents
//! departments:
//!   - name: Emergency
//!     location: Ground floor
//! suppliers:
//!   - name: MedSupply Ltd
//!     email: orders@medsupply.example
//! drugs:
//!   - name: Amoxicillin 500mg
//!     generic_name: Amoxicillin
//!     category: Antibiotics
//!     unit_of_measure: capsule
//!     reorder_level: 100
//! ```
//!
//! Records whose names already exist are skipped, so the file can be applied
//! repeatedly.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use pharmacy_core::CategoryId;
use pharmacy_web::db::CategoryRepository;
use pharmacy_web::models::{CategoryFields, DepartmentFields, DrugFields, SupplierFields};
use pharmacy_web::services::ServiceError;
use pharmacy_web::services::registry::Registry;

use super::connect;

/// Top-level seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReferenceSeed {
    pub categories: Vec<CategorySeed>,
    pub departments: Vec<DepartmentSeed>,
    pub suppliers: Vec<SupplierSeed>,
    pub drugs: Vec<DrugSeed>,
}

#[derive(Debug, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DepartmentSeed {
    pub name: String,
    pub location: Option<String>,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SupplierSeed {
    pub name: String,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DrugSeed {
    pub name: String,
    pub generic_name: Option<String>,
    /// Category name, resolved after categories are seeded.
    pub category: Option<String>,
    pub unit_of_measure: String,
    #[serde(default)]
    pub reorder_level: i32,
    pub description: Option<String>,
}

/// Counts reported after seeding.
#[derive(Debug, Default)]
struct Tally {
    inserted: usize,
    skipped: usize,
}

impl Tally {
    /// Count one result; conflicts mean the record already exists.
    fn record<T>(&mut self, kind: &str, name: &str, result: Result<T, ServiceError>) -> Result<(), ServiceError> {
        match result {
            Ok(_) => self.inserted += 1,
            Err(ServiceError::Conflict(_)) => {
                info!("Skipping existing {kind}: {name}");
                self.skipped += 1;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

/// Seed categories, departments, suppliers and drugs from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, a record is
/// invalid, or the database fails.
pub async fn reference(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading reference data from file");
    let content = tokio::fs::read_to_string(path).await?;
    let seed: ReferenceSeed = serde_yaml::from_str(&content)?;

    let pool = connect().await?;
    let registry = Registry::new(&pool);
    let mut tally = Tally::default();

    for c in seed.categories {
        let result = registry
            .create_category(CategoryFields {
                name: c.name.clone(),
                description: c.description,
            })
            .await;
        tally.record("category", &c.name, result)?;
    }

    for d in seed.departments {
        let result = registry
            .create_department(DepartmentFields {
                name: d.name.clone(),
                location: d.location,
                contact_person: d.contact_person,
                contact_phone: d.contact_phone,
                is_active: true,
            })
            .await;
        tally.record("department", &d.name, result)?;
    }

    for s in seed.suppliers {
        let result = registry
            .create_supplier(SupplierFields {
                name: s.name.clone(),
                contact_person: s.contact_person,
                contact_phone: s.contact_phone,
                email: s.email,
                address: s.address,
                is_active: true,
            })
            .await;
        tally.record("supplier", &s.name, result)?;
    }

    let categories: HashMap<String, CategoryId> = CategoryRepository::new(&pool)
        .list()
        .await?
        .into_iter()
        .map(|c| (c.name.to_lowercase(), c.id))
        .collect();

    for d in seed.drugs {
        let category_id = match d.category.as_deref() {
            Some(name) => {
                let id = categories.get(&name.to_lowercase()).copied();
                if id.is_none() {
                    warn!("Unknown category {name} for drug {}", d.name);
                }
                id
            }
            None => None,
        };
        let result = registry
            .create_drug(DrugFields {
                name: d.name.clone(),
                generic_name: d.generic_name,
                category_id,
                unit_of_measure: d.unit_of_measure,
                reorder_level: d.reorder_level,
                description: d.description,
            })
            .await;
        tally.record("drug", &d.name, result)?;
    }

    info!("Seeding complete!");
    info!("  Records inserted: {}", tally.inserted);
    info!("  Records skipped (already exist): {}", tally.skipped);
    Ok(())
}
