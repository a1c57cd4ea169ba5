use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use shared_models::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    BookAppointments,
    BookServices,
    ManageSchedules,
    ManageServices,
    DispatchFire,
    ManageBloodInventory,
    RunCampaigns,
    Administer,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Capability::BookAppointments,
        Capability::BookServices,
        Capability::ManageSchedules,
        Capability::ManageServices,
        Capability::DispatchFire,
        Capability::ManageBloodInventory,
        Capability::RunCampaigns,
        Capability::Administer,
    ];
}

/// What the signed-in user may do, resolved once per session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    granted: BTreeSet<Capability>,
}

impl Capabilities {
    pub fn for_role(role: Option<Role>) -> Self {
        use Capability::*;

        let granted: &[Capability] = match role {
            Some(Role::Patient) | Some(Role::Doctor) => &[BookAppointments, BookServices],
            Some(Role::Hospital) => &[ManageSchedules, ManageServices],
            Some(Role::FireService) => &[DispatchFire],
            Some(Role::BloodBank) => &[ManageBloodInventory],
            Some(Role::Org) => &[RunCampaigns],
            Some(Role::Admin) => &Capability::ALL,
            None => &[],
        };

        Self {
            granted: granted.iter().copied().collect(),
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.granted.contains(&capability)
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.granted.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_can_book() {
        let caps = Capabilities::for_role(Some(Role::Patient));
        assert!(caps.has(Capability::BookAppointments));
        assert!(caps.has(Capability::BookServices));
        assert!(!caps.has(Capability::ManageSchedules));
    }

    #[test]
    fn test_hospital_manages_but_does_not_book() {
        let caps = Capabilities::for_role(Some(Role::Hospital));
        assert!(caps.has(Capability::ManageSchedules));
        assert!(!caps.has(Capability::BookAppointments));
    }

    #[test]
    fn test_admin_has_everything() {
        let caps = Capabilities::for_role(Some(Role::Admin));
        assert_eq!(caps.iter().count(), Capability::ALL.len());
    }

    #[test]
    fn test_unknown_role_has_nothing() {
        assert!(Capabilities::for_role(None).is_empty());
    }
}
