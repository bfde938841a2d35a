//! Test fixtures and helpers.
//!
//! In-memory stand-ins for the registry, profile and artifact services,
//! a manually driven clock, and a ready-wired kernel with a cast of actors.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;

use skypermit::{
    ArtifactStore, Clock, Collaborators, DroneRegistry, Kernel, KernelConfig, PermissionArtifact,
    UserProfiles,
};
use skypermit_core::{
    Application, ApplicationForm, ApplicationId, Decision, DroneId, EntryDigest, LatLong,
    OperatorDrone, OperatorDroneStatus, OperatorRef, Submission, UserId, UserProfile,
};
use skypermit_perms::Actor;
use skypermit_store::{MemoryStore, Store};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory collaborators
// ─────────────────────────────────────────────────────────────────────────────

/// Drone registry backed by a map.
#[derive(Default)]
pub struct MemoryDroneRegistry {
    drones: Mutex<HashMap<DroneId, OperatorDrone>>,
}

impl MemoryDroneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, drone: OperatorDrone) {
        lock(&self.drones).insert(drone.id, drone);
    }

    pub fn set_status(&self, id: DroneId, status: OperatorDroneStatus) {
        if let Some(drone) = lock(&self.drones).get_mut(&id) {
            drone.status = status;
        }
    }
}

#[async_trait]
impl DroneRegistry for MemoryDroneRegistry {
    async fn find_drone(&self, id: DroneId) -> Option<OperatorDrone> {
        lock(&self.drones).get(&id).cloned()
    }
}

/// User profiles backed by a map. Unknown users get an empty profile.
#[derive(Default)]
pub struct StaticProfiles {
    profiles: Mutex<HashMap<UserId, UserProfile>>,
}

impl StaticProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, profile: UserProfile) {
        lock(&self.profiles).insert(profile.user_id, profile);
    }
}

#[async_trait]
impl UserProfiles for StaticProfiles {
    async fn profile(&self, user_id: UserId) -> UserProfile {
        lock(&self.profiles)
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| UserProfile::new(user_id))
    }
}

/// Permission artifacts backed by a map.
#[derive(Default)]
pub struct MemoryArtifacts {
    artifacts: Mutex<HashMap<ApplicationId, PermissionArtifact>>,
}

impl MemoryArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, application_id: ApplicationId, artifact: PermissionArtifact) {
        lock(&self.artifacts).insert(application_id, artifact);
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifacts {
    async fn permission_artifact(
        &self,
        application_id: &ApplicationId,
    ) -> Option<PermissionArtifact> {
        lock(&self.artifacts).get(application_id).cloned()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cast and defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Fixture start time (2023-11-14T22:13:20Z).
pub const START: i64 = 1_700_000_000_000;

const HOUR: i64 = 60 * 60 * 1000;

/// Default authorized window: one to two hours after `START`.
pub const WINDOW_START: i64 = START + HOUR;
pub const WINDOW_END: i64 = START + 2 * HOUR;

/// Owned by the operator, UIN approved.
pub const APPROVED_DRONE: DroneId = DroneId(1);
/// Owned by the operator, UIN still under review.
pub const PENDING_DRONE: DroneId = DroneId(2);
/// Owned by another operator, UIN approved.
pub const FOREIGN_DRONE: DroneId = DroneId(3);

pub const APPROVED_UIN: &str = "UA-0001";

const OPERATOR_ID: u64 = 100;
const OTHER_OPERATOR_ID: u64 = 200;

/// A ready-wired kernel plus handles on every collaborator.
pub struct TestFixture<S: Store = MemoryStore> {
    pub kernel: Kernel<S>,
    pub drones: Arc<MemoryDroneRegistry>,
    pub profiles: Arc<StaticProfiles>,
    pub artifacts: Arc<MemoryArtifacts>,
    pub clock: Arc<ManualClock>,

    /// Applicant who operates `APPROVED_DRONE` and `PENDING_DRONE`.
    pub operator: Actor,
    /// Applicant who operates `FOREIGN_DRONE`.
    pub other_operator: Actor,
    /// A user with no drones and no roles.
    pub stranger: Actor,
    pub admin: Actor,
    pub atc: Actor,
    pub afmlu: Actor,
    pub viewer: Actor,
    pub atc_viewer: Actor,
    pub afmlu_viewer: Actor,
}

impl TestFixture<MemoryStore> {
    /// Create a new fixture over an in-memory store.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new(), KernelConfig::default())
    }

    pub fn with_config(config: KernelConfig) -> Self {
        Self::with_store(MemoryStore::new(), config)
    }
}

impl Default for TestFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Store> TestFixture<S> {
    /// Create a fixture over any store.
    pub fn with_store(store: S, config: KernelConfig) -> Self {
        let drones = Arc::new(MemoryDroneRegistry::new());
        let profiles = Arc::new(StaticProfiles::new());
        let artifacts = Arc::new(MemoryArtifacts::new());
        let clock = Arc::new(ManualClock::new(START));

        let operator = Actor::new(UserId(1));
        let other_operator = Actor::new(UserId(2));

        profiles.insert(UserProfile {
            individual_operator_id: Some(OPERATOR_ID),
            ..UserProfile::new(operator.id)
        });
        profiles.insert(UserProfile {
            organization_operator_id: Some(OTHER_OPERATOR_ID),
            ..UserProfile::new(other_operator.id)
        });

        drones.insert(OperatorDrone {
            id: APPROVED_DRONE,
            operator: OperatorRef::individual(OPERATOR_ID),
            uin: Some(APPROVED_UIN.to_string()),
            status: OperatorDroneStatus::UinApproved,
        });
        drones.insert(OperatorDrone {
            id: PENDING_DRONE,
            operator: OperatorRef::individual(OPERATOR_ID),
            uin: None,
            status: OperatorDroneStatus::UinSubmitted,
        });
        drones.insert(OperatorDrone {
            id: FOREIGN_DRONE,
            operator: OperatorRef::organization(OTHER_OPERATOR_ID),
            uin: Some("UA-0003".to_string()),
            status: OperatorDroneStatus::UinApproved,
        });

        let services = Collaborators::new(drones.clone(), profiles.clone(), artifacts.clone())
            .with_clock(clock.clone());

        Self {
            kernel: Kernel::new(store, services, config),
            drones,
            profiles,
            artifacts,
            clock,
            operator,
            other_operator,
            stranger: Actor::new(UserId(3)),
            admin: Actor::from_claims(UserId(10), ["ROLE_ADMIN"]),
            atc: Actor::from_claims(UserId(11), ["ROLE_ATC_ADMIN"]),
            afmlu: Actor::from_claims(UserId(12), ["ROLE_AFMLU_ADMIN"]),
            viewer: Actor::from_claims(UserId(13), ["ROLE_VIEWER_ADMIN"]),
            atc_viewer: Actor::from_claims(UserId(14), ["ROLE_ATC_VIEWER_ADMIN"]),
            afmlu_viewer: Actor::from_claims(UserId(15), ["ROLE_AFMLU_VIEWER_ADMIN"]),
        }
    }

    /// Create and submit a valid application as the operator.
    pub async fn submitted_application(&self) -> Application {
        match self
            .kernel
            .create_application(&self.operator, valid_form(APPROVED_DRONE), Submission::Submit)
            .await
        {
            Ok(application) => application,
            Err(err) => panic!("fixture submission failed: {}", err),
        }
    }

    /// Submit an application and have the central administrator approve it.
    pub async fn approved_application(&self) -> Application {
        let application = self.submitted_application().await;
        match self
            .kernel
            .approve(&self.admin, &application.id, Decision::Approve, None)
            .await
        {
            Ok(application) => application,
            Err(err) => panic!("fixture approval failed: {}", err),
        }
    }

    /// Move the clock to the end of an application's window.
    pub fn finish_flight(&self, application: &Application) {
        self.clock.set(application.end_at());
    }
}

/// A form that passes submission validation for `drone_id`.
pub fn valid_form(drone_id: DroneId) -> ApplicationForm {
    ApplicationForm {
        drone_id,
        pilot_id: Some("PILOT-0001".to_string()),
        flight_purpose: Some("survey".to_string()),
        payload_weight_kg: Some(0.5),
        max_altitude_ft: Some(200),
        fly_area: vec![
            LatLong::new(12.97, 77.59),
            LatLong::new(12.97, 77.60),
            LatLong::new(12.98, 77.60),
            LatLong::new(12.98, 77.59),
        ],
        start_at: WINDOW_START,
        end_at: WINDOW_END,
        recurring_time_expression: None,
        recurring_time_duration_minutes: None,
    }
}

/// A JSON flight-log document as uploaded by an operator.
pub fn flight_log_document(signature: &str, previous_hash: Option<&EntryDigest>) -> Bytes {
    let previous_hash = previous_hash.map(|d| d.to_hex()).unwrap_or_default();
    let document = serde_json::json!({
        "signature": signature,
        "previousHash": previous_hash,
        "flightData": [
            { "timestamp": WINDOW_START, "latitude": 12.975, "longitude": 77.595, "altitude": 120 },
            { "timestamp": WINDOW_END, "latitude": 12.976, "longitude": 77.596, "altitude": 0 },
        ],
    });
    Bytes::from(document.to_string())
}

/// A permission artifact with a predictable name.
pub fn permission_artifact(application_id: &ApplicationId) -> PermissionArtifact {
    PermissionArtifact {
        file_name: format!("permission-{}.xml", application_id),
        bytes: Bytes::from_static(b"<UAPermission/>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_collaborators() {
        let fixture = TestFixture::new();

        let drone = fixture.drones.find_drone(APPROVED_DRONE).await.unwrap();
        let profile = fixture.profiles.profile(fixture.operator.id).await;
        assert!(profile.owns(&drone));
        assert!(drone.is_uin_approved());

        let stranger = fixture.profiles.profile(fixture.stranger.id).await;
        assert!(!stranger.owns(&drone));

        fixture.clock.advance(5);
        assert_eq!(fixture.clock.now_millis(), START + 5);
    }

    #[tokio::test]
    async fn test_fixture_approved_application() {
        let fixture = TestFixture::new();
        let application = fixture.approved_application().await;
        assert!(application.status.is_approved());
        assert_eq!(application.drone_uin.as_deref(), Some(APPROVED_UIN));
    }

    #[test]
    fn test_flight_log_document_shape() {
        let digest = EntryDigest::from_bytes([1; 32]);
        let doc = flight_log_document("sig", Some(&digest));
        let value: serde_json::Value = serde_json::from_slice(&doc).unwrap();
        assert_eq!(value["signature"], "sig");
        assert_eq!(value["previousHash"], digest.to_hex());
    }
}
