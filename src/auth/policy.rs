//! Role gate: static operation → allowed roles policy.
//!
//! # Design Decisions
//! - No hierarchy or inheritance; each operation lists its full allow-set
//! - Deny by default: no identity, or a role outside the set, is refused
//! - The policy is built once at startup and never mutated

use std::collections::HashMap;

use serde::Serialize;

use super::identity::{Identity, Role};

/// Every guarded operation exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ViewPatients,
    CreatePatient,
    DeletePatient,
    CreateAppointment,
    RecordPayment,
    InviteStaff,
    ViewAuditLog,
    RunRetentionSweep,
    ViewSystemStatus,
}

impl Operation {
    pub const ALL: [Operation; 9] = [
        Operation::ViewPatients,
        Operation::CreatePatient,
        Operation::DeletePatient,
        Operation::CreateAppointment,
        Operation::RecordPayment,
        Operation::InviteStaff,
        Operation::ViewAuditLog,
        Operation::RunRetentionSweep,
        Operation::ViewSystemStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ViewPatients => "view_patients",
            Operation::CreatePatient => "create_patient",
            Operation::DeletePatient => "delete_patient",
            Operation::CreateAppointment => "create_appointment",
            Operation::RecordPayment => "record_payment",
            Operation::InviteStaff => "invite_staff",
            Operation::ViewAuditLog => "view_audit_log",
            Operation::RunRetentionSweep => "run_retention_sweep",
            Operation::ViewSystemStatus => "view_system_status",
        }
    }
}

/// Pure membership check.
pub fn permit(identity: Option<&Identity>, allowed: &[Role]) -> bool {
    identity.is_some_and(|id| allowed.contains(&id.role))
}

/// Immutable operation → roles table.
#[derive(Debug, Clone)]
pub struct RolePolicy {
    rules: HashMap<Operation, &'static [Role]>,
}

impl RolePolicy {
    pub fn standard() -> Self {
        use Role::*;

        let mut rules: HashMap<Operation, &'static [Role]> = HashMap::new();
        rules.insert(
            Operation::ViewPatients,
            &[SuperAdmin, PracticeAdmin, Manager, Dentist, Hygienist, Receptionist],
        );
        rules.insert(
            Operation::CreatePatient,
            &[SuperAdmin, PracticeAdmin, Manager, Dentist, Receptionist],
        );
        rules.insert(Operation::DeletePatient, &[SuperAdmin, PracticeAdmin]);
        rules.insert(
            Operation::CreateAppointment,
            &[SuperAdmin, PracticeAdmin, Manager, Dentist, Hygienist, Receptionist],
        );
        rules.insert(
            Operation::RecordPayment,
            &[SuperAdmin, PracticeAdmin, Manager, Receptionist],
        );
        rules.insert(Operation::InviteStaff, &[SuperAdmin, PracticeAdmin]);
        rules.insert(Operation::ViewAuditLog, &[SuperAdmin, PracticeAdmin]);
        rules.insert(Operation::RunRetentionSweep, &[SuperAdmin]);
        rules.insert(Operation::ViewSystemStatus, &[SuperAdmin, PracticeAdmin]);
        Self { rules }
    }

    /// Roles permitted for `operation`; empty when the operation is unknown.
    pub fn allowed(&self, operation: Operation) -> &'static [Role] {
        self.rules.get(&operation).copied().unwrap_or(&[])
    }

    pub fn permits(&self, identity: Option<&Identity>, operation: Operation) -> bool {
        permit(identity, self.allowed(operation))
    }
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role) -> Identity {
        Identity {
            id: "u".into(),
            email: "u@clinic.test".into(),
            role,
            active: true,
        }
    }

    #[test]
    fn test_permit_matches_membership_for_every_combination() {
        // Every subset of the six roles as an allow-set.
        for mask in 0u32..(1 << Role::ALL.len()) {
            let allowed: Vec<Role> = Role::ALL
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, r)| *r)
                .collect();
            for role in Role::ALL {
                let id = identity(role);
                assert_eq!(permit(Some(&id), &allowed), allowed.contains(&role));
            }
        }
    }

    #[test]
    fn test_missing_identity_is_denied() {
        assert!(!permit(None, &Role::ALL));
    }

    #[test]
    fn test_every_operation_has_a_policy() {
        let policy = RolePolicy::standard();
        for op in Operation::ALL {
            assert!(!policy.allowed(op).is_empty(), "{op:?} has no roles");
        }
    }

    #[test]
    fn test_sweep_is_super_admin_only() {
        let policy = RolePolicy::standard();
        assert!(policy.permits(Some(&identity(Role::SuperAdmin)), Operation::RunRetentionSweep));
        assert!(!policy.permits(Some(&identity(Role::PracticeAdmin)), Operation::RunRetentionSweep));
    }
}
