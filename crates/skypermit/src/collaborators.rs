//! Interfaces to services the kernel consumes but does not own.
//!
//! The drone registry, user profiles and artifact storage live elsewhere.
//! The kernel only reads from them.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;

use skypermit_core::{
    ApplicationId, DroneId, OperatorDrone, QuartzSchedule, ScheduleValidator, UserId,
    UserProfile,
};

/// Read access to registered operator drones.
#[async_trait]
pub trait DroneRegistry: Send + Sync {
    async fn find_drone(&self, id: DroneId) -> Option<OperatorDrone>;
}

/// Read access to user operator memberships.
#[async_trait]
pub trait UserProfiles: Send + Sync {
    /// A user with no memberships gets an empty profile.
    async fn profile(&self, user_id: UserId) -> UserProfile;
}

/// A generated permit document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionArtifact {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Storage of generated permit documents.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn permission_artifact(&self, application_id: &ApplicationId)
        -> Option<PermissionArtifact>;
}

/// Source of the current time, in Unix milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Everything the kernel consumes, bundled.
#[derive(Clone)]
pub struct Collaborators {
    pub drones: Arc<dyn DroneRegistry>,
    pub profiles: Arc<dyn UserProfiles>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub schedule: Arc<dyn ScheduleValidator>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Bundle the external services with the Quartz schedule grammar and
    /// the system clock.
    pub fn new(
        drones: Arc<dyn DroneRegistry>,
        profiles: Arc<dyn UserProfiles>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            drones,
            profiles,
            artifacts,
            schedule: Arc::new(QuartzSchedule),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_schedule(mut self, schedule: Arc<dyn ScheduleValidator>) -> Self {
        self.schedule = schedule;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }
}
