//! Role naming
//!
//! Roles are named after a base role plus a running number ("Operario 2").
//! The number comes from counting the roles whose name starts with the base
//! name, so it is a display convenience and not a unique identifier: deleting
//! "Operario 1" and adding another Operario yields a second "Operario 2", and
//! a base name that prefixes another ("Admin" / "Administrador") counts both.
//! Roles created here also get a UUID in [`Role::id`], which is stable.

use uuid::Uuid;

use crate::error::FincaError;
use crate::models::{CollectionKey, Role};

/// `base_name` followed by one more than the number of roles starting with it
pub fn next_role_name(existing: &[Role], base_name: &str) -> String {
    let count = existing
        .iter()
        .filter(|r| r.name.starts_with(base_name))
        .count();
    format!("{} {}", base_name, count + 1)
}

/// Form state for creating or editing a role
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleForm {
    /// One of [`crate::models::PREDEFINED_ROLES`] in the original forms
    pub base_name: String,
    pub description: String,
}

impl RoleForm {
    pub fn new(base_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            description: description.into(),
        }
    }

    /// Pre-fills the form from an existing role, keeping only its base name
    pub fn from_role(role: &Role) -> Self {
        Self {
            base_name: role.base_name().to_string(),
            description: role.description.clone(),
        }
    }

    /// Builds the role to submit.
    ///
    /// The name is always regenerated from `existing`, including when editing,
    /// so an edited role can change its number. When `editing` points at an
    /// existing role its id is kept.
    pub fn build(&self, existing: &[Role], editing: Option<usize>) -> Result<Role, FincaError> {
        if self.base_name.is_empty() {
            return Err(FincaError::Validation {
                collection: CollectionKey::Roles,
                field: "roleName",
            });
        }

        let id = editing
            .and_then(|i| existing.get(i))
            .and_then(|r| r.id)
            .unwrap_or_else(Uuid::new_v4);

        Ok(Role {
            name: next_role_name(existing, &self.base_name),
            description: self.description.clone(),
            id: Some(id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(name: &str) -> Role {
        Role {
            name: name.to_string(),
            description: "d".to_string(),
            id: None,
        }
    }

    #[test]
    fn test_next_role_name_starts_at_one() {
        assert_eq!(next_role_name(&[], "Operario"), "Operario 1");
    }

    #[test]
    fn test_next_role_name_counts_matching_prefix() {
        assert_eq!(
            next_role_name(&[role("Operario 1")], "Operario"),
            "Operario 2"
        );

        let roles = vec![role("Operario 1"), role("Usuario 1"), role("Operario 2")];
        assert_eq!(next_role_name(&roles, "Operario"), "Operario 3");
        assert_eq!(next_role_name(&roles, "Usuario"), "Usuario 2");
    }

    #[test]
    fn test_next_role_name_collides_after_delete() {
        // "Operario 1" was deleted, leaving only "Operario 2"
        let roles = vec![role("Operario 2")];
        assert_eq!(next_role_name(&roles, "Operario"), "Operario 2");
    }

    #[test]
    fn test_next_role_name_counts_longer_names_sharing_prefix() {
        let roles = vec![role("Administrador 1")];
        assert_eq!(next_role_name(&roles, "Admin"), "Admin 2");
    }

    #[test]
    fn test_build_requires_base_name() {
        let form = RoleForm::new("", "Sin nombre");
        assert!(matches!(
            form.build(&[], None),
            Err(FincaError::Validation { field: "roleName", .. })
        ));
    }

    #[test]
    fn test_build_assigns_fresh_id_and_keeps_it_on_edit() {
        let created = RoleForm::new("Operario", "Campo")
            .build(&[], None)
            .unwrap();
        assert_eq!(created.name, "Operario 1");
        let id = created.id.unwrap();

        let existing = vec![created];
        let form = RoleForm::from_role(&existing[0]);
        assert_eq!(form.base_name, "Operario");

        let edited = form.build(&existing, Some(0)).unwrap();
        // The edited role is counted too
        assert_eq!(edited.name, "Operario 2");
        assert_eq!(edited.id, Some(id));
    }

    #[test]
    fn test_build_on_legacy_role_assigns_id() {
        let existing = vec![role("Usuario 1")];
        let edited = RoleForm::new("Usuario", "x")
            .build(&existing, Some(0))
            .unwrap();
        assert!(edited.id.is_some());
    }
}
