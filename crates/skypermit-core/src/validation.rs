//! Validation gate: drone reference checks and submission checks.
//!
//! These are pure functions. The kernel fetches the drone and the acting
//! user's profile, then asks the gate whether the reference is usable.

use crate::application::ApplicationForm;
use crate::drone::{OperatorDrone, UserProfile};
use crate::error::{GateError, ValidationError};
use crate::schedule::ScheduleValidator;
use crate::types::DroneId;

/// Minimum number of vertices in a fly-area polygon.
pub const MIN_FLY_AREA_VERTICES: usize = 3;

/// Check that a drone reference is usable by the acting user.
///
/// Checks run in order and stop at the first failure:
/// 1. the drone exists
/// 2. the user operates it
/// 3. its UIN is approved
pub fn validate_drone_reference<'a>(
    drone_id: DroneId,
    drone: Option<&'a OperatorDrone>,
    profile: &UserProfile,
) -> Result<&'a OperatorDrone, GateError> {
    let drone = drone.ok_or(GateError::DroneNotFound(drone_id))?;

    if !profile.owns(drone) {
        return Err(GateError::NotOwner {
            user_id: profile.user_id,
            drone_id: drone.id,
        });
    }

    if !drone.is_uin_approved() {
        return Err(ValidationError::DroneNotApproved {
            drone_id: drone.id,
            status: drone.status,
        }
        .into());
    }

    Ok(drone)
}

/// Check a recurrence schedule. An absent or blank expression passes.
pub fn validate_recurrence(
    expr: Option<&str>,
    duration_minutes: Option<i64>,
    validator: &dyn ScheduleValidator,
) -> Result<(), ValidationError> {
    let expr = match expr.map(str::trim) {
        Some(expr) if !expr.is_empty() => expr,
        _ => return Ok(()),
    };

    validator.parse_and_validate(expr).map_err(|reason| {
        ValidationError::InvalidScheduleExpression(format!("{}: {}", expr, reason))
    })?;

    match duration_minutes {
        Some(minutes) if minutes > 0 => Ok(()),
        other => Err(ValidationError::InvalidScheduleDuration(other)),
    }
}

/// Full validation of a form being submitted.
pub fn validate_submission(
    form: &ApplicationForm,
    validator: &dyn ScheduleValidator,
) -> Result<(), ValidationError> {
    if form.start_at >= form.end_at {
        return Err(ValidationError::InvalidFlightWindow {
            start: form.start_at,
            end: form.end_at,
        });
    }

    if form.fly_area.len() < MIN_FLY_AREA_VERTICES {
        return Err(ValidationError::InvalidFlyArea(format!(
            "{} vertices, at least {} required",
            form.fly_area.len(),
            MIN_FLY_AREA_VERTICES
        )));
    }
    if let Some((index, point)) = form
        .fly_area
        .iter()
        .enumerate()
        .find(|(_, point)| !point.is_valid())
    {
        return Err(ValidationError::InvalidFlyArea(format!(
            "vertex {} out of range ({}, {})",
            index, point.latitude, point.longitude
        )));
    }

    validate_recurrence(
        form.recurring_time_expression.as_deref(),
        form.recurring_time_duration_minutes,
        validator,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::LatLong;
    use crate::drone::{OperatorDroneStatus, OperatorRef};
    use crate::schedule::QuartzSchedule;
    use crate::types::UserId;

    fn drone(status: OperatorDroneStatus) -> OperatorDrone {
        OperatorDrone {
            id: DroneId(7),
            operator: OperatorRef::individual(5),
            uin: Some("UA0007".into()),
            status,
        }
    }

    fn owner() -> UserProfile {
        UserProfile {
            individual_operator_id: Some(5),
            ..UserProfile::new(UserId(1))
        }
    }

    fn square() -> Vec<LatLong> {
        vec![
            LatLong::new(12.0, 77.0),
            LatLong::new(12.0, 77.1),
            LatLong::new(12.1, 77.1),
            LatLong::new(12.1, 77.0),
        ]
    }

    fn submittable() -> ApplicationForm {
        ApplicationForm {
            drone_id: DroneId(7),
            fly_area: square(),
            start_at: 1_000,
            end_at: 2_000,
            ..ApplicationForm::default()
        }
    }

    #[test]
    fn test_gate_accepts_owned_approved_drone() {
        let d = drone(OperatorDroneStatus::UinApproved);
        let accepted = validate_drone_reference(DroneId(7), Some(&d), &owner()).unwrap();
        assert_eq!(accepted.id, DroneId(7));
    }

    #[test]
    fn test_gate_missing_drone() {
        assert_eq!(
            validate_drone_reference(DroneId(7), None, &owner()),
            Err(GateError::DroneNotFound(DroneId(7)))
        );
    }

    #[test]
    fn test_gate_checks_ownership_before_status() {
        // not owned and not approved: ownership is reported
        let d = drone(OperatorDroneStatus::UinDraft);
        let stranger = UserProfile::new(UserId(2));
        assert_eq!(
            validate_drone_reference(DroneId(7), Some(&d), &stranger),
            Err(GateError::NotOwner {
                user_id: UserId(2),
                drone_id: DroneId(7),
            })
        );
    }

    #[test]
    fn test_gate_rejects_unapproved_uin() {
        for status in [
            OperatorDroneStatus::Registered,
            OperatorDroneStatus::UinDraft,
            OperatorDroneStatus::UinSubmitted,
            OperatorDroneStatus::UinRejected,
        ] {
            let d = drone(status);
            assert_eq!(
                validate_drone_reference(DroneId(7), Some(&d), &owner()),
                Err(GateError::Invalid(ValidationError::DroneNotApproved {
                    drone_id: DroneId(7),
                    status,
                }))
            );
        }
    }

    #[test]
    fn test_recurrence_absent_passes() {
        assert!(validate_recurrence(None, None, &QuartzSchedule).is_ok());
        assert!(validate_recurrence(Some("  "), None, &QuartzSchedule).is_ok());
    }

    #[test]
    fn test_recurrence_valid() {
        assert!(validate_recurrence(Some("0 0 12 * * ?"), Some(30), &QuartzSchedule).is_ok());
    }

    #[test]
    fn test_recurrence_bad_expression() {
        let err = validate_recurrence(Some("0 0 12 * * *"), Some(30), &QuartzSchedule).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidScheduleExpression(_)));
    }

    #[test]
    fn test_recurrence_requires_positive_duration() {
        for duration in [None, Some(0), Some(-5)] {
            assert_eq!(
                validate_recurrence(Some("0 0 12 * * ?"), duration, &QuartzSchedule),
                Err(ValidationError::InvalidScheduleDuration(duration))
            );
        }
    }

    #[test]
    fn test_expression_checked_before_duration() {
        let err = validate_recurrence(Some("bogus"), None, &QuartzSchedule).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidScheduleExpression(_)));
    }

    #[test]
    fn test_submission_ok() {
        assert!(validate_submission(&submittable(), &QuartzSchedule).is_ok());
    }

    #[test]
    fn test_submission_window_must_be_ordered() {
        let form = ApplicationForm {
            end_at: 1_000,
            ..submittable()
        };
        assert_eq!(
            validate_submission(&form, &QuartzSchedule),
            Err(ValidationError::InvalidFlightWindow {
                start: 1_000,
                end: 1_000,
            })
        );
    }

    #[test]
    fn test_submission_fly_area() {
        let mut form = submittable();
        form.fly_area.truncate(2);
        assert!(matches!(
            validate_submission(&form, &QuartzSchedule),
            Err(ValidationError::InvalidFlyArea(_))
        ));

        let mut form = submittable();
        form.fly_area[1] = LatLong::new(95.0, 0.0);
        assert!(matches!(
            validate_submission(&form, &QuartzSchedule),
            Err(ValidationError::InvalidFlyArea(_))
        ));
    }

    #[test]
    fn test_submission_runs_recurrence() {
        let form = ApplicationForm {
            recurring_time_expression: Some("0 0 12 * * ?".into()),
            recurring_time_duration_minutes: None,
            ..submittable()
        };
        assert_eq!(
            validate_submission(&form, &QuartzSchedule),
            Err(ValidationError::InvalidScheduleDuration(None))
        );
    }
}
