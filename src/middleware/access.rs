use crate::{
    error::{AppError, AppResult},
    models::{auth::AuthenticatedUser, user::UserRole},
};

/// Operations gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    /// Day-to-day records: horses, clients, certificates, subscriptions, lessons.
    ManageRecords,
    ManageStaff,
    DeleteRecords,
    ManageUsers,
    ManageContent,
}

const EVERYONE: &[UserRole] = &[UserRole::Observer, UserRole::Instructor, UserRole::Administrator];
const STAFF: &[UserRole] = &[UserRole::Instructor, UserRole::Administrator];
const ADMIN: &[UserRole] = &[UserRole::Administrator];

impl Action {
    pub fn allowed_roles(self) -> &'static [UserRole] {
        match self {
            Action::View => EVERYONE,
            Action::ManageRecords => STAFF,
            Action::ManageStaff
            | Action::DeleteRecords
            | Action::ManageUsers
            | Action::ManageContent => ADMIN,
        }
    }

    pub fn permits(self, role: UserRole) -> bool {
        self.allowed_roles().contains(&role)
    }
}

impl AuthenticatedUser {
    /// Fails with 403 unless the user's role may perform `action`.
    pub fn require(&self, action: Action) -> AppResult<()> {
        if action.permits(self.role) {
            Ok(())
        } else {
            tracing::debug!(user_id = %self.user_id, role = %self.role, ?action, "access denied");
            Err(AppError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(role: UserRole) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            name: "Test".into(),
            role,
        }
    }

    #[test]
    fn observers_only_view() {
        assert!(Action::View.permits(UserRole::Observer));
        for action in [
            Action::ManageRecords,
            Action::ManageStaff,
            Action::DeleteRecords,
            Action::ManageUsers,
            Action::ManageContent,
        ] {
            assert!(!action.permits(UserRole::Observer), "{action:?}");
        }
    }

    #[test]
    fn instructors_manage_records_but_not_staff_or_deletes() {
        assert!(Action::ManageRecords.permits(UserRole::Instructor));
        assert!(!Action::ManageStaff.permits(UserRole::Instructor));
        assert!(!Action::DeleteRecords.permits(UserRole::Instructor));
        assert!(!Action::ManageUsers.permits(UserRole::Instructor));
    }

    #[test]
    fn administrators_can_do_everything() {
        let admin = user(UserRole::Administrator);
        for action in [
            Action::View,
            Action::ManageRecords,
            Action::ManageStaff,
            Action::DeleteRecords,
            Action::ManageUsers,
            Action::ManageContent,
        ] {
            assert!(admin.require(action).is_ok());
        }
    }

    #[test]
    fn require_reports_forbidden() {
        let err = user(UserRole::Observer).require(Action::DeleteRecords).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }
}
