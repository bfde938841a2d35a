//! Error types for the Kernel.

use skypermit_core::{
    ApplicationId, ApplicationStatus, ChainError, GateError, TransitionError, ValidationError,
};
use skypermit_perms::AccessDenied;
use skypermit_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Kernel operations.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Application does not exist.
    #[error("application not found: {0}")]
    ApplicationNotFound(ApplicationId),

    /// Referenced drone does not exist in the registry.
    #[error("drone not found: {0}")]
    DroneNotFound(skypermit_core::DroneId),

    /// No permission artifact has been generated for the application.
    #[error("permission artifact not found for application {0}")]
    ArtifactNotFound(ApplicationId),

    /// Actor lacks ownership or a required role.
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AccessDenied),

    /// Applicant edit attempted outside `DRAFT`.
    #[error("application {id} is {status}, only DRAFT applications can be modified")]
    NotModifiable {
        id: ApplicationId,
        status: ApplicationStatus,
    },

    /// Content validation failed.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Authority acted on an application not at its precondition status.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Operation requires an approved application.
    #[error("application {id} is {status}, not approved")]
    ApplicationNotApproved {
        id: ApplicationId,
        status: ApplicationStatus,
    },

    /// Flight log submitted before the authorized window ended.
    #[error("flight window ends at {end_at}, log cannot be filed at {now}")]
    FlightNotYetComplete { end_at: i64, now: i64 },

    /// Submitted log does not continue the chain.
    #[error("flight log rejected: {0}")]
    Chain(#[from] ChainError),

    /// Stored chain no longer verifies.
    #[error("flight log integrity violated: {0}")]
    Integrity(ChainError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration document.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<GateError> for KernelError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::DroneNotFound(drone_id) => KernelError::DroneNotFound(drone_id),
            GateError::NotOwner { user_id, drone_id } => KernelError::Unauthorized(
                AccessDenied::new(user_id, format!("does not operate drone {}", drone_id)),
            ),
            GateError::Invalid(err) => KernelError::Validation(err),
        }
    }
}

/// Coarse classification of a [`KernelError`].
///
/// Only `Persistence` is retryable. `Persistence` and `IntegrityViolation`
/// are server faults; everything else is the caller's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    NotModifiable,
    ValidationFailed,
    NotInSubmittedStatus,
    ApplicationNotApproved,
    FlightNotYetComplete,
    ChainBroken,
    IntegrityViolation,
    Persistence,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        self == ErrorKind::Persistence
    }

    pub fn is_client_fault(self) -> bool {
        !matches!(self, ErrorKind::Persistence | ErrorKind::IntegrityViolation)
    }
}

impl KernelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KernelError::ApplicationNotFound(_)
            | KernelError::DroneNotFound(_)
            | KernelError::ArtifactNotFound(_) => ErrorKind::NotFound,
            KernelError::Unauthorized(_) => ErrorKind::Unauthorized,
            KernelError::NotModifiable { .. } => ErrorKind::NotModifiable,
            KernelError::Validation(_) | KernelError::Config(_) => ErrorKind::ValidationFailed,
            KernelError::Transition(_) => ErrorKind::NotInSubmittedStatus,
            KernelError::ApplicationNotApproved { .. } => ErrorKind::ApplicationNotApproved,
            KernelError::FlightNotYetComplete { .. } => ErrorKind::FlightNotYetComplete,
            KernelError::Chain(_) => ErrorKind::ChainBroken,
            KernelError::Integrity(_) => ErrorKind::IntegrityViolation,
            KernelError::Store(_) => ErrorKind::Persistence,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Result type for Kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;
    use skypermit_core::{
        AuthorityRole, DroneId, EntryDigest, OperatorDroneStatus, UserId,
    };

    #[test]
    fn test_gate_mapping() {
        let not_found: KernelError = GateError::DroneNotFound(DroneId(3)).into();
        assert_eq!(not_found.kind(), ErrorKind::NotFound);

        let not_owner: KernelError = GateError::NotOwner {
            user_id: UserId(1),
            drone_id: DroneId(3),
        }
        .into();
        assert_eq!(not_owner.kind(), ErrorKind::Unauthorized);

        let unapproved: KernelError = GateError::Invalid(ValidationError::DroneNotApproved {
            drone_id: DroneId(3),
            status: OperatorDroneStatus::UinDraft,
        })
        .into();
        assert_eq!(unapproved.kind(), ErrorKind::ValidationFailed);
    }

    #[test]
    fn test_only_persistence_is_retryable() {
        let id = ApplicationId::from_bytes([1; 16]);
        let client_faults = vec![
            KernelError::ApplicationNotFound(id),
            KernelError::ArtifactNotFound(id),
            KernelError::Unauthorized(AccessDenied::new(UserId(1), "no")),
            KernelError::NotModifiable {
                id,
                status: ApplicationStatus::Submitted,
            },
            KernelError::Validation(ValidationError::InvalidDroneId(DroneId(0))),
            KernelError::Transition(TransitionError::NotInSubmittedStatus {
                role: AuthorityRole::Admin,
                required: ApplicationStatus::Submitted,
                actual: ApplicationStatus::Approved,
            }),
            KernelError::ApplicationNotApproved {
                id,
                status: ApplicationStatus::Submitted,
            },
            KernelError::FlightNotYetComplete { end_at: 2, now: 1 },
            KernelError::Chain(ChainError::Broken {
                expected: None,
                got: Some(EntryDigest::from_bytes([0; 32])),
            }),
        ];
        for err in client_faults {
            assert!(err.kind().is_client_fault(), "{} should be a client fault", err);
            assert!(!err.is_retryable());
        }

        let store = KernelError::Store(StoreError::TaskFailed("cancelled".into()));
        assert_eq!(store.kind(), ErrorKind::Persistence);
        assert!(store.is_retryable());
        assert!(!store.kind().is_client_fault());
    }

    #[test]
    fn test_stored_corruption_is_not_a_client_fault() {
        let broken = ChainError::Broken {
            expected: Some(EntryDigest::from_bytes([1; 32])),
            got: Some(EntryDigest::from_bytes([2; 32])),
        };
        let rejected: KernelError = broken.clone().into();
        assert_eq!(rejected.kind(), ErrorKind::ChainBroken);
        assert!(rejected.kind().is_client_fault());

        let corrupted = KernelError::Integrity(broken);
        assert_eq!(corrupted.kind(), ErrorKind::IntegrityViolation);
        assert!(!corrupted.kind().is_client_fault());
        assert!(!corrupted.is_retryable());
        assert!(corrupted.to_string().starts_with("flight log integrity violated"));
    }

    #[test]
    fn test_messages_are_readable() {
        let err = KernelError::Transition(TransitionError::NotInSubmittedStatus {
            role: AuthorityRole::AfmluAdmin,
            required: ApplicationStatus::ApprovedByAtc,
            actual: ApplicationStatus::Submitted,
        });
        assert_eq!(
            err.to_string(),
            "application is SUBMITTED, AFMLU_ADMIN approval requires APPROVEDBYATC"
        );
    }
}
