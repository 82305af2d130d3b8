//! User roles and the page access matrix.
//!
//! Access is decided in one place: [`Role::can_access`]. Handlers name the
//! [`Page`] they serve and the gate checks it once per request.

use serde::{Deserialize, Serialize};

/// Role assigned to a pharmacy user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Every page, including user administration.
    Admin,
    /// Dispensing: transactions, drugs, inventory and categories.
    Pharmacist,
    /// Ward stock: drugs, inventory and reference-data management.
    DepartmentStaff,
}

impl Role {
    /// All roles, in the order they are offered in forms.
    pub const ALL: [Self; 3] = [Self::Admin, Self::Pharmacist, Self::DepartmentStaff];

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "Administrator",
            Self::Pharmacist => "Pharmacist",
            Self::DepartmentStaff => "Department Staff",
        }
    }

    /// Stable identifier stored in the database and submitted by forms.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Pharmacist => "pharmacist",
            Self::DepartmentStaff => "department_staff",
        }
    }

    /// Whether this role may open `page`.
    #[must_use]
    pub const fn can_access(self, page: Page) -> bool {
        match (self, page) {
            (Self::Admin, _) | (_, Page::Dashboard | Page::ChangePassword) => true,
            (Self::Pharmacist, page) => matches!(
                page,
                Page::Transactions | Page::Drugs | Page::Inventory | Page::Categories
            ),
            (Self::DepartmentStaff, page) => matches!(
                page,
                Page::Drugs | Page::Inventory | Page::Categories | Page::Management
            ),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "pharmacist" => Ok(Self::Pharmacist),
            "department_staff" => Ok(Self::DepartmentStaff),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// A gated screen of the web interface.
///
/// Management bundles suppliers, departments and the category list, which is
/// why department staff can reach categories without the pharmacist screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Dashboard,
    ChangePassword,
    Drugs,
    Inventory,
    Transactions,
    Categories,
    Management,
    Users,
}

impl Page {
    /// Every gated page.
    pub const ALL: [Self; 8] = [
        Self::Dashboard,
        Self::ChangePassword,
        Self::Drugs,
        Self::Inventory,
        Self::Transactions,
        Self::Categories,
        Self::Management,
        Self::Users,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_reaches_every_page() {
        for page in Page::ALL {
            assert!(Role::Admin.can_access(page), "admin denied {page:?}");
        }
    }

    #[test]
    fn test_every_role_reaches_dashboard_and_password() {
        for role in Role::ALL {
            assert!(role.can_access(Page::Dashboard));
            assert!(role.can_access(Page::ChangePassword));
        }
    }

    #[test]
    fn test_pharmacist_pages() {
        let role = Role::Pharmacist;
        assert!(role.can_access(Page::Transactions));
        assert!(role.can_access(Page::Drugs));
        assert!(role.can_access(Page::Inventory));
        assert!(role.can_access(Page::Categories));
        assert!(!role.can_access(Page::Management));
        assert!(!role.can_access(Page::Users));
    }

    #[test]
    fn test_department_staff_pages() {
        let role = Role::DepartmentStaff;
        assert!(role.can_access(Page::Drugs));
        assert!(role.can_access(Page::Inventory));
        assert!(role.can_access(Page::Management));
        assert!(!role.can_access(Page::Transactions));
        assert!(!role.can_access(Page::Users));
    }

    #[test]
    fn test_role_parse_and_display() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
        assert!("superuser".parse::<Role>().is_err());
    }
}
