//! Stateless access predicates.
//!
//! Decisions depend only on the actor's id and role claims and on the
//! resource's recorded owner. Nothing here touches storage.

use skypermit_core::{Application, UserId};

use crate::actor::Actor;
use crate::error::{AccessDenied, Result};
use crate::role::Role;

/// Roles that may read the central administrator's listing.
pub const ADMIN_VIEW_ROLES: &[Role] = &[Role::Admin, Role::ViewerAdmin];

/// Roles that may read the ATC listing.
pub const ATC_VIEW_ROLES: &[Role] = &[Role::AtcAdmin, Role::AtcViewerAdmin];

/// Roles that may read the AFMLU listing.
pub const AFMLU_VIEW_ROLES: &[Role] = &[Role::AfmluAdmin, Role::AfmluViewerAdmin];

/// A resource with a single recorded owner.
pub trait Owned {
    fn owner(&self) -> UserId;
}

impl Owned for Application {
    fn owner(&self) -> UserId {
        self.applicant_id
    }
}

pub fn is_owner<R: Owned + ?Sized>(actor: &Actor, resource: &R) -> bool {
    actor.id == resource.owner()
}

pub fn has_role(actor: &Actor, role: Role) -> bool {
    actor.roles.contains(&role)
}

pub fn has_any_role(actor: &Actor, roles: &[Role]) -> bool {
    roles.iter().any(|role| actor.roles.contains(role))
}

/// The central administrator.
pub fn is_admin(actor: &Actor) -> bool {
    has_role(actor, Role::Admin)
}

/// Holds at least one authority or viewer role.
pub fn is_staff(actor: &Actor) -> bool {
    !actor.roles.is_empty()
}

pub fn require_owner<R: Owned + ?Sized>(actor: &Actor, resource: &R) -> Result<()> {
    if is_owner(actor, resource) {
        Ok(())
    } else {
        Err(AccessDenied::new(actor.id, "not the owner"))
    }
}

pub fn require_role(actor: &Actor, role: Role) -> Result<()> {
    if has_role(actor, role) {
        Ok(())
    } else {
        Err(AccessDenied::new(actor.id, format!("missing role {}", role)))
    }
}

pub fn require_any_role(actor: &Actor, roles: &[Role]) -> Result<()> {
    if has_any_role(actor, roles) {
        Ok(())
    } else {
        let names: Vec<&str> = roles.iter().map(|role| role.as_str()).collect();
        Err(AccessDenied::new(
            actor.id,
            format!("requires one of {}", names.join(", ")),
        ))
    }
}

pub fn require_admin(actor: &Actor) -> Result<()> {
    require_role(actor, Role::Admin)
}

/// The owner, or (when `admin_allowed`) the central administrator.
pub fn require_owner_or_admin<R: Owned + ?Sized>(
    actor: &Actor,
    resource: &R,
    admin_allowed: bool,
) -> Result<()> {
    if is_owner(actor, resource) || (admin_allowed && is_admin(actor)) {
        Ok(())
    } else {
        Err(AccessDenied::new(actor.id, "neither the owner nor an admin"))
    }
}

/// The owner, or anyone holding an authority or viewer role.
pub fn require_owner_or_staff<R: Owned + ?Sized>(actor: &Actor, resource: &R) -> Result<()> {
    if is_owner(actor, resource) || is_staff(actor) {
        Ok(())
    } else {
        Err(AccessDenied::new(actor.id, "neither the owner nor staff"))
    }
}
