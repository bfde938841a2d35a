//! Proptest generators for property-based testing.

use bytes::Bytes;
use proptest::prelude::*;

use skypermit_core::{
    ApplicationForm, ApplicationId, ApplicationStatus, AuthorityRole, Decision, DroneId,
    EntryDigest, FlightLogEntry, LatLong, LogRecord, UserId,
};
use skypermit_perms::Role;

/// Generate a random ApplicationId.
pub fn application_id() -> impl Strategy<Value = ApplicationId> {
    any::<[u8; 16]>().prop_map(ApplicationId)
}

/// Generate a registered (non-zero) DroneId.
pub fn drone_id() -> impl Strategy<Value = DroneId> {
    (1u64..=10_000).prop_map(DroneId)
}

pub fn user_id() -> impl Strategy<Value = UserId> {
    any::<u64>().prop_map(UserId)
}

/// Generate a random EntryDigest.
pub fn entry_digest() -> impl Strategy<Value = EntryDigest> {
    any::<[u8; 32]>().prop_map(EntryDigest::from_bytes)
}

pub fn application_status() -> impl Strategy<Value = ApplicationStatus> {
    prop::sample::select(ApplicationStatus::ALL.to_vec())
}

pub fn authority_role() -> impl Strategy<Value = AuthorityRole> {
    prop::sample::select(AuthorityRole::ALL.to_vec())
}

pub fn role() -> impl Strategy<Value = Role> {
    prop::sample::select(Role::ALL.to_vec())
}

pub fn decision() -> impl Strategy<Value = Decision> {
    prop_oneof![Just(Decision::Approve), Just(Decision::Reject)]
}

/// Generate a flight-log payload up to `max_size` bytes.
pub fn payload(max_size: usize) -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 0..=max_size).prop_map(Bytes::from)
}

/// Generate a non-empty printable signature.
pub fn signature() -> impl Strategy<Value = String> {
    "[A-Za-z0-9+/=]{1,88}"
}

pub fn lat_long() -> impl Strategy<Value = LatLong> {
    (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, long)| LatLong::new(lat, long))
}

/// A form with a well-ordered window, a valid fly area and no recurrence.
pub fn valid_form() -> impl Strategy<Value = ApplicationForm> {
    (
        drone_id(),
        prop::collection::vec(lat_long(), 3..=8),
        0i64..=1_700_000_000_000,
        1i64..=86_400_000,
        prop::option::of(0u32..=400),
    )
        .prop_map(|(drone_id, fly_area, start_at, length, max_altitude_ft)| ApplicationForm {
            drone_id,
            max_altitude_ft,
            fly_area,
            start_at,
            end_at: start_at + length,
            ..ApplicationForm::default()
        })
}

/// Parameters for a well-formed flight-log chain.
#[derive(Debug, Clone)]
pub struct ChainParams {
    pub application_id: ApplicationId,
    pub drone_uin: String,
    pub logs: Vec<(String, Bytes)>,
}

impl Arbitrary for ChainParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            application_id(),
            "UA-[0-9]{4}",
            prop::collection::vec((signature(), payload(256)), 1..=8),
        )
            .prop_map(|(application_id, drone_uin, logs)| ChainParams {
                application_id,
                drone_uin,
                logs,
            })
            .boxed()
    }
}

/// Seal a chain from parameters, each entry naming its predecessor.
pub fn chain_from_params(params: &ChainParams) -> Vec<LogRecord> {
    let mut records: Vec<LogRecord> = Vec::with_capacity(params.logs.len());
    for (i, (signature, payload)) in params.logs.iter().enumerate() {
        let entry = FlightLogEntry::new(
            params.application_id,
            params.drone_uin.clone(),
            signature.clone(),
            records.last().map(|r| r.digest),
        );
        records.push(LogRecord::seal(
            i as u64 + 1,
            entry,
            payload.clone(),
            1_700_000_000_000 + i as i64,
        ));
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use skypermit_core::{apply_decision, validate_submission, verify_chain, QuartzSchedule};

    proptest! {
        #[test]
        fn test_generated_chains_verify(params: ChainParams) {
            let records = chain_from_params(&params);
            prop_assert_eq!(records.len(), params.logs.len());
            prop_assert!(verify_chain(&records).is_ok());
        }

        #[test]
        fn test_chain_digests_deterministic(params: ChainParams) {
            let a = chain_from_params(&params);
            let b = chain_from_params(&params);
            let da: Vec<_> = a.iter().map(|r| r.digest).collect();
            let db: Vec<_> = b.iter().map(|r| r.digest).collect();
            prop_assert_eq!(da, db);
        }

        #[test]
        fn test_tampered_payload_detected(
            params in any::<ChainParams>(),
            idx in any::<prop::sample::Index>(),
        ) {
            let mut records = chain_from_params(&params);
            let i = idx.index(records.len());
            let mut tampered = records[i].payload.to_vec();
            tampered.push(0xff);
            records[i].payload = Bytes::from(tampered);
            prop_assert!(verify_chain(&records).is_err());
        }

        #[test]
        fn test_valid_forms_pass_submission(form in valid_form()) {
            prop_assert!(validate_submission(&form, &QuartzSchedule).is_ok());
        }

        #[test]
        fn test_decisions_only_from_precondition(
            role in authority_role(),
            status in application_status(),
            choice in decision(),
        ) {
            let row = skypermit_core::Transition::for_role(role);
            let result = apply_decision(role, status, choice);
            prop_assert_eq!(result.is_ok(), status == row.precondition);
        }
    }
}
