//! # SkyPermit Permissions
//!
//! Access policy for permit operations.
//!
//! ## Overview
//!
//! Every kernel operation receives an explicit [`Actor`]: the user's id
//! plus the role claims established by authentication. Access decisions
//! are stateless predicates over that actor and the resource's recorded
//! owner:
//!
//! - **Ownership**: the applicant owns their application ([`Owned`])
//! - **Authority roles**: `ADMIN`, `ATC_ADMIN`, `AFMLU_ADMIN` may act
//! - **Viewer roles**: `VIEWER_ADMIN`, `ATC_VIEWER_ADMIN`,
//!   `AFMLU_VIEWER_ADMIN` may only read scoped listings
//!
//! ## Usage
//!
//! ```rust
//! use skypermit_core::UserId;
//! use skypermit_perms::{require_any_role, Actor, Role, ATC_VIEW_ROLES};
//!
//! let viewer = Actor::new(UserId(7)).with_role(Role::AtcViewerAdmin);
//! assert!(require_any_role(&viewer, ATC_VIEW_ROLES).is_ok());
//! ```

pub mod actor;
pub mod error;
pub mod policy;
pub mod role;

pub use actor::Actor;
pub use error::{AccessDenied, Result};
pub use policy::{
    has_any_role, has_role, is_admin, is_owner, is_staff, require_admin, require_any_role,
    require_owner, require_owner_or_admin, require_owner_or_staff, require_role, Owned,
    ADMIN_VIEW_ROLES, AFMLU_VIEW_ROLES, ATC_VIEW_ROLES,
};
pub use role::Role;
