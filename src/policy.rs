//! Role-based policy: a flat, stateless lookup from `(user, command)` to
//! an allow/deny decision (spec §1, §6, §10.5).
//!
//! The spec frames the policy loader as "a flat lookup over a
//! declarative table" and deliberately out of the integrity-critical
//! core — the core only consumes `allow(user, command) -> Decision` and
//! never inspects how the table was built.

use std::collections::HashMap;

/// Outcome of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// A named bundle of permitted commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Operator,
    Auditor,
}

impl Role {
    fn allows(self, command: &str) -> bool {
        match self {
            Role::Admin => true,
            Role::Operator => matches!(command, "backup" | "list" | "verify" | "restore"),
            Role::Auditor => matches!(command, "list" | "verify" | "audit-verify"),
        }
    }
}

/// A declarative `user -> role` table plus the pure `allow` predicate.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    assignments: HashMap<String, Role>,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, user: impl Into<String>, role: Role) -> &mut Self {
        self.assignments.insert(user.into(), role);
        self
    }

    /// A small built-in default table: `root` and `admin` get the
    /// `Admin` role, `backup-operator` gets `Operator`, `auditor` gets
    /// `Auditor`. Anyone else is denied every command. Seeded this way
    /// because the spec names no external policy-file format — see
    /// DESIGN.md.
    pub fn default_table() -> Self {
        let mut policy = Self::new();
        policy
            .assign("root", Role::Admin)
            .assign("admin", Role::Admin)
            .assign("backup-operator", Role::Operator)
            .assign("auditor", Role::Auditor);
        policy
    }

    /// Pure predicate: does `user` (who has no role if unassigned) get
    /// to run `command`?
    pub fn allow(&self, user: &str, command: &str) -> Decision {
        match self.assignments.get(user) {
            Some(role) if role.allows(command) => Decision::Allow,
            _ => Decision::Deny,
        }
    }
}
