//! The Kernel: the permit service.
//!
//! The Kernel brings together storage, the validation gate, the transition
//! table and the flight-log chain behind one interface. Every operation
//! takes the acting [`Actor`] explicitly.
//!
//! Every operation checks everything before it writes, and writes go
//! through the store's conditional operations, so a rejected call leaves
//! all state unchanged.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use skypermit_core::{
    apply_decision, check_extends, validate_drone_reference, validate_submission, verify_chain,
    Application, ApplicationForm, ApplicationId, ApplicationStatus, AuthorityRole, ChainError,
    Decision, DecisionRecord, DroneId, EntryDigest, FlightLogEntry, LogRecord, Submission,
    Transition, TransitionError, ValidationError,
};
use skypermit_perms::{
    require_admin, require_any_role, require_owner, require_owner_or_admin,
    require_owner_or_staff, require_role, Actor, ADMIN_VIEW_ROLES, AFMLU_VIEW_ROLES,
    ATC_VIEW_ROLES,
};
use skypermit_store::{AppendResult, InsertResult, Store, StoreError, UpdateResult};

use crate::collaborators::{Collaborators, PermissionArtifact};
use crate::config::KernelConfig;
use crate::error::{KernelError, Result};
use crate::flight_log::FlightLogSubmission;

/// Statuses shown in the ATC listing.
pub const ATC_VIEW_STATUSES: &[ApplicationStatus] = &[
    ApplicationStatus::Submitted,
    ApplicationStatus::ApprovedByAtc,
    ApplicationStatus::RejectedByAtc,
];

/// Statuses shown in the AFMLU listing.
pub const AFMLU_VIEW_STATUSES: &[ApplicationStatus] = &[
    ApplicationStatus::ApprovedByAtc,
    ApplicationStatus::ApprovedByAfmlu,
    ApplicationStatus::RejectedByAfmlu,
];

/// The main Kernel struct.
///
/// Provides a unified API for:
/// - Creating, editing and submitting applications
/// - Authority approvals and rejections
/// - Role-scoped listings
/// - Filing and verifying flight logs
pub struct Kernel<S: Store> {
    /// The storage backend.
    store: Arc<S>,
    /// External services.
    services: Collaborators,
    /// Configuration.
    config: KernelConfig,
}

impl<S: Store> Kernel<S> {
    /// Create a new kernel instance.
    pub fn new(store: S, services: Collaborators, config: KernelConfig) -> Self {
        Self {
            store: Arc::new(store),
            services,
            config,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    fn now(&self) -> i64 {
        self.services.clock.now_millis()
    }

    async fn load(&self, id: &ApplicationId) -> Result<Application> {
        self.store
            .get_application(id)
            .await?
            .ok_or(KernelError::ApplicationNotFound(*id))
    }

    /// Run the drone gate for `actor` and return the drone's UIN.
    async fn check_drone(&self, actor: &Actor, drone_id: DroneId) -> Result<Option<String>> {
        let drone = self.services.drones.find_drone(drone_id).await;
        let profile = self.services.profiles.profile(actor.id).await;
        let drone = validate_drone_reference(drone_id, drone.as_ref(), &profile)?;
        Ok(drone.uin.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Applicant Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create an application owned by `actor`.
    ///
    /// The drone gate always runs. Submission validation runs only when
    /// `submission` is `Submit`; drafts may hold incomplete content.
    pub async fn create_application(
        &self,
        actor: &Actor,
        form: ApplicationForm,
        submission: Submission,
    ) -> Result<Application> {
        let drone_uin = self.check_drone(actor, form.drone_id).await?;
        if submission.is_submit() {
            validate_submission(&form, self.services.schedule.as_ref())?;
        }

        let application = Application::new(
            ApplicationId::generate(),
            actor.id,
            form,
            drone_uin,
            submission,
            self.now(),
        );

        match self.store.insert_application(&application).await? {
            InsertResult::Inserted => {}
            InsertResult::AlreadyExists => {
                return Err(StoreError::InvalidData(format!(
                    "application id collision: {}",
                    application.id
                ))
                .into());
            }
        }

        info!(
            application_id = %application.id,
            applicant = %actor.id,
            drone_id = %application.drone_id(),
            status = %application.status,
            "application created"
        );
        Ok(application)
    }

    /// Replace the content of a draft application.
    pub async fn update_application(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        form: ApplicationForm,
        submission: Submission,
    ) -> Result<Application> {
        let mut application = self.load(id).await?;
        require_owner(actor, &application)?;
        if !application.can_be_modified() {
            return Err(KernelError::NotModifiable {
                id: *id,
                status: application.status,
            });
        }

        let drone_uin = self.check_drone(actor, form.drone_id).await?;
        if submission.is_submit() {
            validate_submission(&form, self.services.schedule.as_ref())?;
        }

        let expected = application.status;
        application.apply_form(form, drone_uin, submission, self.now());

        match self.store.update_application(&application, expected).await? {
            UpdateResult::Updated => {
                info!(application_id = %id, status = %application.status, "application updated");
                Ok(application)
            }
            UpdateResult::StatusMismatch { actual } => {
                warn!(application_id = %id, %actual, "application changed during update");
                Err(KernelError::NotModifiable {
                    id: *id,
                    status: actual,
                })
            }
            UpdateResult::Missing => Err(KernelError::ApplicationNotFound(*id)),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authority Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Record an authority decision.
    ///
    /// One function serves all three authorities; the role selects the
    /// row of the transition table. Concurrent decisions on the same
    /// application serialize on the stored status: one wins, the others
    /// fail with `NotInSubmittedStatus`.
    pub async fn approve_application(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        role: AuthorityRole,
        decision: Decision,
        comments: Option<String>,
    ) -> Result<Application> {
        let mut application = self.load(id).await?;
        require_role(actor, role.into())?;

        let expected = application.status;
        let next = apply_decision(role, expected, decision)?;
        let now = self.now();

        application.record_decision(DecisionRecord {
            role,
            decision,
            approver: actor.id,
            decided_at: now,
            comments,
            resulting_status: next,
        });

        match self.store.update_application(&application, expected).await? {
            UpdateResult::Updated => {
                info!(
                    application_id = %id,
                    %role,
                    approver = %actor.id,
                    from = %expected,
                    to = %next,
                    "application transitioned"
                );
                Ok(application)
            }
            UpdateResult::StatusMismatch { actual } => {
                warn!(application_id = %id, %role, %actual, "lost transition race");
                Err(TransitionError::NotInSubmittedStatus {
                    role,
                    required: Transition::for_role(role).precondition,
                    actual,
                }
                .into())
            }
            UpdateResult::Missing => Err(KernelError::ApplicationNotFound(*id)),
        }
    }

    /// Central administrator decision: `SUBMITTED` to `APPROVED`/`REJECTED`.
    pub async fn approve(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        decision: Decision,
        comments: Option<String>,
    ) -> Result<Application> {
        self.approve_application(actor, id, AuthorityRole::Admin, decision, comments)
            .await
    }

    /// ATC decision: `SUBMITTED` to `APPROVEDBYATC`/`REJECTEDBYATC`.
    pub async fn approve_by_atc(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        decision: Decision,
        comments: Option<String>,
    ) -> Result<Application> {
        self.approve_application(actor, id, AuthorityRole::AtcAdmin, decision, comments)
            .await
    }

    /// AFMLU decision: `APPROVEDBYATC` to `APPROVEDBYAFMLU`/`REJECTEDBYAFMLU`.
    pub async fn approve_by_afmlu(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        decision: Decision,
        comments: Option<String>,
    ) -> Result<Application> {
        self.approve_application(actor, id, AuthorityRole::AfmluAdmin, decision, comments)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch one application. The applicant and any staff role may read it.
    pub async fn get_application(&self, actor: &Actor, id: &ApplicationId) -> Result<Application> {
        let application = self.load(id).await?;
        require_owner_or_staff(actor, &application)?;
        Ok(application)
    }

    /// Applications referencing a drone the actor operates.
    pub async fn list_by_drone(
        &self,
        actor: &Actor,
        drone_id: DroneId,
    ) -> Result<Vec<Application>> {
        if !drone_id.is_valid() {
            return Err(ValidationError::InvalidDroneId(drone_id).into());
        }
        self.check_drone(actor, drone_id).await?;
        Ok(self.store.list_applications_by_drone(drone_id).await?)
    }

    /// Every application, drafts included.
    pub async fn list_all(&self, actor: &Actor) -> Result<Vec<Application>> {
        require_admin(actor)?;
        Ok(self.store.list_applications().await?)
    }

    /// The administrator's queue: everything but drafts.
    pub async fn list_for_admin(&self, actor: &Actor) -> Result<Vec<Application>> {
        require_any_role(actor, ADMIN_VIEW_ROLES)?;
        let statuses: Vec<ApplicationStatus> = ApplicationStatus::ALL
            .into_iter()
            .filter(|status| *status != ApplicationStatus::Draft)
            .collect();
        Ok(self.store.list_applications_with_status(&statuses).await?)
    }

    pub async fn list_for_atc(&self, actor: &Actor) -> Result<Vec<Application>> {
        require_any_role(actor, ATC_VIEW_ROLES)?;
        Ok(self
            .store
            .list_applications_with_status(ATC_VIEW_STATUSES)
            .await?)
    }

    pub async fn list_for_afmlu(&self, actor: &Actor) -> Result<Vec<Application>> {
        require_any_role(actor, AFMLU_VIEW_ROLES)?;
        Ok(self
            .store
            .list_applications_with_status(AFMLU_VIEW_STATUSES)
            .await?)
    }

    /// The generated permit document of an approved application.
    pub async fn permission_artifact(
        &self,
        actor: &Actor,
        id: &ApplicationId,
    ) -> Result<PermissionArtifact> {
        let application = self.load(id).await?;
        require_owner_or_admin(actor, &application, true)?;
        if !application.status.is_approved() {
            return Err(KernelError::ApplicationNotApproved {
                id: *id,
                status: application.status,
            });
        }

        self.services
            .artifacts
            .permission_artifact(id)
            .await
            .ok_or(KernelError::ArtifactNotFound(*id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Flight Logs
    // ─────────────────────────────────────────────────────────────────────────

    /// Checks every log append passes before the chain is consulted.
    async fn authorize_log_append(
        &self,
        actor: &Actor,
        id: &ApplicationId,
    ) -> Result<(Application, i64)> {
        let application = self.load(id).await?;

        if !application.status.is_approved() {
            return Err(KernelError::ApplicationNotApproved {
                id: *id,
                status: application.status,
            });
        }

        let now = self.now();
        if !application.flight_complete(now) {
            return Err(KernelError::FlightNotYetComplete {
                end_at: application.end_at(),
                now,
            });
        }

        require_owner_or_admin(actor, &application, self.config.allow_admin_log_submission)?;
        Ok((application, now))
    }

    async fn append_to_chain(
        &self,
        application: &Application,
        submission: FlightLogSubmission,
        now: i64,
    ) -> Result<LogRecord> {
        let id = application.id;
        let entry = FlightLogEntry::new(
            id,
            application.drone_uin.clone().unwrap_or_default(),
            submission.signature,
            submission.previous_hash,
        );

        let tail = self.store.chain_tail(&id).await?;
        let tail_digest = tail.map(|t| t.digest);
        if let Err(err) = check_extends(tail_digest.as_ref(), &entry) {
            warn!(application_id = %id, error = %err, "flight log does not extend chain");
            return Err(err.into());
        }

        let seq = tail.map_or(1, |t| t.seq + 1);
        let record = LogRecord::seal(seq, entry, submission.payload, now);

        match self
            .store
            .append_log_record(&record, tail_digest.as_ref())
            .await?
        {
            AppendResult::Appended => {
                info!(application_id = %id, seq, digest = %record.digest, "flight log accepted");
                Ok(record)
            }
            AppendResult::TailMoved { actual } => {
                warn!(application_id = %id, "chain tail moved during append");
                Err(ChainError::Broken {
                    expected: actual,
                    got: record.entry.previous_hash,
                }
                .into())
            }
        }
    }

    /// Append a flight log to an approved application's chain.
    ///
    /// Checks, in order: the application exists, is approved, its window
    /// has ended (inclusive), the actor is the applicant or an admin, and
    /// the submission names the current tail.
    pub async fn accept_flight_log(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        submission: FlightLogSubmission,
    ) -> Result<LogRecord> {
        let (application, now) = self.authorize_log_append(actor, id).await?;
        self.append_to_chain(&application, submission, now).await
    }

    /// Parse an uploaded JSON flight-log document and append it.
    pub async fn submit_flight_log(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        document: Bytes,
    ) -> Result<LogRecord> {
        let (application, now) = self.authorize_log_append(actor, id).await?;
        let submission = FlightLogSubmission::parse(document, self.config.max_flight_log_bytes)?;
        self.append_to_chain(&application, submission, now).await
    }

    async fn load_for_log_access(&self, actor: &Actor, id: &ApplicationId) -> Result<Application> {
        let application = self.load(id).await?;
        require_owner_or_admin(actor, &application, self.config.allow_admin_log_submission)?;
        Ok(application)
    }

    /// Digest the next log must name as `previousHash`, or `None` if no
    /// log has been filed yet.
    pub async fn flight_log_tail(
        &self,
        actor: &Actor,
        id: &ApplicationId,
    ) -> Result<Option<EntryDigest>> {
        self.load_for_log_access(actor, id).await?;
        Ok(self.store.chain_tail(id).await?.map(|t| t.digest))
    }

    /// Every accepted log of an application, in order.
    pub async fn flight_log(&self, actor: &Actor, id: &ApplicationId) -> Result<Vec<LogRecord>> {
        self.load_for_log_access(actor, id).await?;
        Ok(self.store.log_records(id).await?)
    }

    /// Re-derive every digest and check linkage. Returns the chain length.
    pub async fn verify_flight_log(&self, actor: &Actor, id: &ApplicationId) -> Result<usize> {
        self.load_for_log_access(actor, id).await?;
        let records = self.store.log_records(id).await?;
        if let Err(err) = verify_chain(&records) {
            warn!(application_id = %id, error = %err, "flight log chain failed verification");
            return Err(KernelError::Integrity(err));
        }
        Ok(records.len())
    }
}
