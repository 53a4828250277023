//! Roles and the authorization predicates evaluated after authentication.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{ROLE_ADMIN, ROLE_EMPLOYEE};
use crate::errors::{AppError, AppResult};

/// Account roles enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => ROLE_ADMIN,
            Role::Employee => ROLE_EMPLOYEE,
        }
    }

    /// Check if this role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ROLE_ADMIN => Ok(Role::Admin),
            ROLE_EMPLOYEE => Ok(Role::Employee),
            other => Err(AppError::validation(format!(
                "Invalid role '{}'. Must be admin or employee",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated caller of a service operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
    pub name: String,
    pub email: String,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Admin-only operations.
    pub fn require_admin(&self) -> AppResult<()> {
        self.require_role(Role::Admin)
    }

    /// Employee-only operations (expense submission).
    pub fn require_employee(&self) -> AppResult<()> {
        self.require_role(Role::Employee)
    }

    /// Role equality check, no hierarchy: an admin is not an employee.
    pub fn require_role(&self, role: Role) -> AppResult<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// Resource owner, or any admin.
    pub fn require_owner_or_admin(&self, owner_id: Uuid) -> AppResult<()> {
        if self.id == owner_id || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// Resource owner only, admins included in the refusal.
    pub fn require_owner(&self, owner_id: Uuid) -> AppResult<()> {
        if self.id == owner_id {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            role,
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
        }
    }

    #[test]
    fn test_role_round_trip_through_str() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("employee".parse::<Role>().unwrap(), Role::Employee);
        assert!("manager".parse::<Role>().is_err());
        assert_eq!(Role::Employee.to_string(), "employee");
    }

    #[test]
    fn test_admin_is_not_employee() {
        let admin = actor(Role::Admin);
        assert!(admin.require_admin().is_ok());
        assert!(matches!(admin.require_employee(), Err(AppError::Forbidden)));
    }

    #[test]
    fn test_owner_or_admin() {
        let employee = actor(Role::Employee);
        let admin = actor(Role::Admin);
        let someone_else = Uuid::new_v4();

        assert!(employee.require_owner_or_admin(employee.id).is_ok());
        assert!(employee.require_owner_or_admin(someone_else).is_err());
        assert!(admin.require_owner_or_admin(someone_else).is_ok());
        assert!(admin.require_owner(someone_else).is_err());
    }
}
