use std::str::FromStr;

use chrono::{DateTime, Duration, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::SyncError;

/// Shift `instant` backward by the UTC offset `timezone` has at that instant,
/// so the stored UTC value reads in the target zone what the input reads in
/// UTC. An advert stored with an 08:00 window therefore goes live at 08:00 on
/// every location's wall clock.
///
/// The offset is resolved against the zone's rules as of `instant`, not as of
/// now, which keeps the alignment correct on either side of a DST switch.
pub fn localize(instant: DateTime<Utc>, timezone: &str) -> Result<DateTime<Utc>, SyncError> {
    let tz = Tz::from_str(timezone).map_err(|_| SyncError::UnknownTimezone {
        name: timezone.to_owned(),
    })?;
    let offset_seconds = tz
        .offset_from_utc_datetime(&instant.naive_utc())
        .fix()
        .local_minus_utc();
    Ok(instant - Duration::seconds(i64::from(offset_seconds)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn aligns_sydney_and_tokyo_wall_clocks() {
        // An 08:00Z window lands at 08:00 local in both zones: UTC+11 and UTC+9
        // at that date, so the stored instants differ by the offset gap.
        let start = utc(2023, 1, 10, 8, 0);
        assert_eq!(
            localize(start, "Australia/Sydney").unwrap(),
            utc(2023, 1, 9, 21, 0)
        );
        assert_eq!(
            localize(start, "Asia/Tokyo").unwrap(),
            utc(2023, 1, 9, 23, 0)
        );
    }

    #[test]
    fn uses_the_offset_in_effect_at_the_instant() {
        // America/New_York switched to DST on 2023-03-12: UTC-5 before, UTC-4 after.
        let before = utc(2023, 3, 11, 12, 0);
        let after = utc(2023, 3, 13, 12, 0);
        assert_eq!(
            localize(before, "America/New_York").unwrap(),
            utc(2023, 3, 11, 17, 0)
        );
        assert_eq!(
            localize(after, "America/New_York").unwrap(),
            utc(2023, 3, 13, 16, 0)
        );
    }

    #[test]
    fn shifted_instant_reads_locally_what_the_input_reads_in_utc() {
        let zones = [
            "Europe/London",
            "America/Sao_Paulo",
            "Asia/Kolkata",
            "Pacific/Auckland",
        ];
        let instants = [utc(2023, 1, 10, 8, 0), utc(2023, 6, 21, 23, 30)];
        for zone in zones {
            let tz: Tz = zone.parse().unwrap();
            for instant in instants {
                let local = localize(instant, zone).unwrap().with_timezone(&tz);
                assert_eq!(
                    (local.hour(), local.minute()),
                    (instant.hour(), instant.minute()),
                    "zone {zone}, instant {instant}"
                );
            }
        }
    }

    #[test]
    fn rejects_an_unknown_zone_name() {
        let err = localize(utc(2023, 1, 1, 0, 0), "Mars/Olympus_Mons").unwrap_err();
        assert!(matches!(err, SyncError::UnknownTimezone { ref name } if name == "Mars/Olympus_Mons"));
    }
}
