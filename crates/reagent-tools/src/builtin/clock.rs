//! Current time tool

use crate::{ParamType, ParameterSchema, ToolFailure, ToolSpec};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};

const MAX_OFFSET_HOURS: f64 = 14.0;

/// Format `now` as RFC 3339, shifted by an optional offset in hours
pub fn format_time(now: DateTime<Utc>, offset_hours: Option<f64>) -> Result<String, ToolFailure> {
    let Some(hours) = offset_hours else {
        return Ok(now.to_rfc3339_opts(SecondsFormat::Secs, true));
    };

    if !hours.is_finite() || hours.abs() > MAX_OFFSET_HOURS {
        return Err(ToolFailure::InvalidInput(format!(
            "timezone offset must be within ±{MAX_OFFSET_HOURS} hours, got {hours}"
        )));
    }

    let offset = FixedOffset::east_opt((hours * 3600.0).round() as i32)
        .ok_or_else(|| ToolFailure::InvalidInput(format!("invalid timezone offset {hours}")))?;
    Ok(now
        .with_timezone(&offset)
        .to_rfc3339_opts(SecondsFormat::Secs, false))
}

pub(crate) fn tool() -> ToolSpec {
    ToolSpec::from_fn(
        "current_time",
        "Get the current date and time (RFC 3339), in UTC or at a fixed offset",
        ParameterSchema::new().optional(
            "timezone_offset_hours",
            ParamType::Number,
            "Offset from UTC in hours, e.g. 8 or -5.5",
        ),
        |args| async move { format_time(Utc::now(), args.opt_f64("timezone_offset_hours")) },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_utc() {
        assert_eq!(format_time(fixed_now(), None).unwrap(), "2024-03-01T12:30:00Z");
    }

    #[test]
    fn test_offsets() {
        assert_eq!(
            format_time(fixed_now(), Some(8.0)).unwrap(),
            "2024-03-01T20:30:00+08:00"
        );
        assert_eq!(
            format_time(fixed_now(), Some(-5.5)).unwrap(),
            "2024-03-01T07:00:00-05:30"
        );
    }

    #[test]
    fn test_out_of_range_offset() {
        assert!(matches!(
            format_time(fixed_now(), Some(20.0)),
            Err(ToolFailure::InvalidInput(_))
        ));
    }
}
