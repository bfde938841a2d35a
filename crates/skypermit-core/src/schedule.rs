//! Recurrence schedule validation.
//!
//! Recurring permits carry a Quartz-style cron expression:
//!
//! ```text
//! sec min hour day-of-month month day-of-week [year]
//! ```
//!
//! Exactly one of day-of-month and day-of-week must be `?`. Day-of-week is
//! 1-based (`1` is Sunday) and is shifted onto croner's 0-based numbering
//! before the remaining field syntax is delegated to `croner`. The
//! day-of-month forms `L-n`, `LW` and `nW` are checked here.

use croner::Cron;

/// Parses and checks a recurrence expression.
///
/// Implementations return a human-readable reason on failure.
pub trait ScheduleValidator: Send + Sync {
    fn parse_and_validate(&self, expr: &str) -> Result<(), String>;
}

/// Quartz cron grammar.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuartzSchedule;

const DAY_OF_MONTH: usize = 3;
const DAY_OF_WEEK: usize = 5;
const YEAR: usize = 6;

const MIN_YEAR: u32 = 1970;
const MAX_YEAR: u32 = 2099;

impl ScheduleValidator for QuartzSchedule {
    fn parse_and_validate(&self, expr: &str) -> Result<(), String> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 6 && fields.len() != 7 {
            return Err(format!("expected 6 or 7 fields, got {}", fields.len()));
        }

        for (index, field) in fields.iter().enumerate() {
            if field.contains('?') && index != DAY_OF_MONTH && index != DAY_OF_WEEK {
                return Err(format!("'?' is not allowed in field {}", index + 1));
            }
        }

        let dom_unspecified = fields[DAY_OF_MONTH] == "?";
        let dow_unspecified = fields[DAY_OF_WEEK] == "?";
        if dom_unspecified == dow_unspecified {
            return Err("exactly one of day-of-month and day-of-week must be '?'".to_string());
        }
        for index in [DAY_OF_MONTH, DAY_OF_WEEK] {
            if fields[index] != "?" && fields[index].contains('?') {
                return Err(format!("'?' must stand alone in field {}", index + 1));
            }
        }

        if let Some(year) = fields.get(YEAR) {
            validate_year(year)?;
        }

        let mut normalized: Vec<String> = fields[..YEAR.min(fields.len())]
            .iter()
            .map(|field| if *field == "?" { "*".to_string() } else { field.to_string() })
            .collect();
        if !dom_unspecified {
            normalized[DAY_OF_MONTH] = translate_day_of_month(fields[DAY_OF_MONTH])?;
        }
        if !dow_unspecified {
            normalized[DAY_OF_WEEK] = translate_day_of_week(fields[DAY_OF_WEEK])?;
        }
        let normalized = normalized.join(" ");

        Cron::new(&normalized)
            .with_seconds_optional()
            .parse()
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// `L`, `LW`, `L-n` and `nW` stand alone in the field and are checked here.
/// Anything else goes to croner unchanged.
fn translate_day_of_month(field: &str) -> Result<String, String> {
    let upper = field.to_ascii_uppercase();
    if !upper.contains('L') && !upper.contains('W') {
        return Ok(field.to_string());
    }

    let valid = match upper.as_str() {
        "L" | "LW" => true,
        _ => match (upper.strip_prefix("L-"), upper.strip_suffix('W')) {
            (Some(offset), _) => matches!(offset.parse::<u32>(), Ok(n) if (1..=30).contains(&n)),
            (None, Some(day)) => matches!(day.parse::<u32>(), Ok(n) if (1..=31).contains(&n)),
            (None, None) => false,
        },
    };
    if !valid {
        return Err(format!("invalid day-of-month: {}", field));
    }
    Ok("*".to_string())
}

/// Shifts numeric days from 1-7 (Sunday first) to croner's 0-6. Names pass
/// through. A bare `L` is the last day of the week, Saturday.
fn translate_day_of_week(field: &str) -> Result<String, String> {
    let mut parts = Vec::new();
    for part in field.split(',') {
        let translated = if part.eq_ignore_ascii_case("L") {
            "6".to_string()
        } else if let Some((day, nth)) = part.split_once('#') {
            match nth.parse::<u32>() {
                Ok(n) if (1..=5).contains(&n) => {}
                _ => return Err(format!("invalid day-of-week occurrence: {}", part)),
            }
            format!("{}#{}", shift_day(day)?, nth)
        } else if let Some(day) = part.strip_suffix(['L', 'l']).filter(|d| !d.is_empty()) {
            format!("{}L", shift_day(day)?)
        } else {
            let (range, step) = match part.split_once('/') {
                Some((range, step)) => (range, Some(step)),
                None => (part, None),
            };
            let range = match range.split_once('-') {
                Some((start, end)) => format!("{}-{}", shift_day(start)?, shift_day(end)?),
                None => shift_day(range)?,
            };
            match step {
                Some(step) => format!("{}/{}", range, step),
                None => range,
            }
        };
        parts.push(translated);
    }
    Ok(parts.join(","))
}

fn shift_day(token: &str) -> Result<String, String> {
    if token.is_empty() {
        return Err("empty day-of-week".to_string());
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(token.to_string());
    }
    match token.parse::<u32>() {
        Ok(day) if (1..=7).contains(&day) => Ok((day - 1).to_string()),
        _ => Err(format!("day-of-week out of range 1-7: {}", token)),
    }
}

/// Year field: `*`, a year, a range, a step or a list of those.
fn validate_year(field: &str) -> Result<(), String> {
    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (part, None),
        };

        if let Some(step) = step {
            match step.parse::<u32>() {
                Ok(n) if n > 0 => {}
                _ => return Err(format!("invalid year step: {}", step)),
            }
        }

        if range == "*" {
            continue;
        }

        let (start, end) = match range.split_once('-') {
            Some((start, end)) => (start, end),
            None => (range, range),
        };
        let start = parse_year(start)?;
        let end = parse_year(end)?;
        if start > end {
            return Err(format!("invalid year range: {}", range));
        }
    }
    Ok(())
}

fn parse_year(s: &str) -> Result<u32, String> {
    match s.parse::<u32>() {
        Ok(year) if (MIN_YEAR..=MAX_YEAR).contains(&year) => Ok(year),
        _ => Err(format!("invalid year: {}", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(expr: &str) -> Result<(), String> {
        QuartzSchedule.parse_and_validate(expr)
    }

    #[test]
    fn test_accepts_common_expressions() {
        assert!(check("0 0 12 * * ?").is_ok());
        assert!(check("0 15 10 ? * MON-FRI").is_ok());
        assert!(check("0 0/5 14 * * ?").is_ok());
        assert!(check("0 0 12 1 * ? 2030").is_ok());
        assert!(check("0 0 12 ? * SUN 2026-2030").is_ok());
    }

    #[test]
    fn test_rejects_wrong_field_count() {
        assert!(check("0 12 * * ?").is_err());
        assert!(check("0 0 12 * * ? 2030 extra").is_err());
        assert!(check("").is_err());
    }

    #[test]
    fn test_requires_exactly_one_unspecified_day() {
        // both specified
        assert!(check("0 0 12 * * *").is_err());
        // both unspecified
        assert!(check("0 0 12 ? * ?").is_err());
    }

    #[test]
    fn test_question_mark_only_in_day_fields() {
        assert!(check("? 0 12 * * ?").is_err());
        assert!(check("0 0 ? ? * MON").is_err());
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(check("0 60 12 * * ?").is_err());
        assert!(check("0 0 25 * * ?").is_err());
        assert!(check("0 0 12 * 13 ?").is_err());
    }

    #[test]
    fn test_year_field() {
        assert!(check("0 0 12 * * ? *").is_ok());
        assert!(check("0 0 12 * * ? 2030/2").is_ok());
        assert!(check("0 0 12 * * ? 1969").is_err());
        assert!(check("0 0 12 * * ? 2031-2030").is_err());
        assert!(check("0 0 12 * * ? twenty").is_err());
    }

    #[test]
    fn test_day_of_week_starts_at_sunday_one() {
        assert!(check("0 0 12 ? * 1-7").is_ok());
        assert!(check("0 0 12 ? * 7").is_ok());
        assert!(check("0 0 12 ? * 2,4,6").is_ok());
        assert!(check("0 0 12 ? * 1/2").is_ok());
        assert!(check("0 0 12 ? * 6L").is_ok());
        assert!(check("0 0 12 ? * 6#3").is_ok());
        assert!(check("0 0 12 ? * L").is_ok());

        assert!(check("0 0 12 ? * 0").is_err());
        assert!(check("0 0 12 ? * 0-6").is_err());
        assert!(check("0 0 12 ? * 8").is_err());
        assert!(check("0 0 12 ? * 2#6").is_err());
    }

    #[test]
    fn test_last_and_weekday_day_of_month() {
        assert!(check("0 0 12 L * ?").is_ok());
        assert!(check("0 0 12 LW * ?").is_ok());
        assert!(check("0 0 12 L-3 * ?").is_ok());
        assert!(check("0 0 12 15W * ?").is_ok());

        assert!(check("0 0 12 L-31 * ?").is_err());
        assert!(check("0 0 12 32W * ?").is_err());
        assert!(check("0 0 12 L,15 * ?").is_err());
        assert!(check("0 0 12 WL * ?").is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(check("not a cron expression at all").is_err());
    }
}
