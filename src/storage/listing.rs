//! Directory listing encoding
//!
//! Builds the lines sent over the data connection for MLSD and NLST, and
//! converts between packed FAT date/time fields and calendar timestamps.

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

use crate::storage::filesystem::DirEntry;

const FAT_EPOCH_YEAR: i32 = 1980;
const FAT_LAST_YEAR: i32 = FAT_EPOCH_YEAR + 127;
const MLSD_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Decodes packed FAT date and time fields.
///
/// Out-of-range fields are normalised the way `mktime` does it: month 0 is
/// December of the previous year, day 0 the last day of the previous month,
/// and excess seconds roll over into the next minute.
pub fn fat_to_datetime(date: u16, time: u16) -> Option<NaiveDateTime> {
    let year = FAT_EPOCH_YEAR + i32::from(date >> 9);
    let month = i32::from((date >> 5) & 0x0F);
    let day = i64::from(date & 0x1F);

    let hour = i64::from(time >> 11);
    let minute = i64::from((time >> 5) & 0x3F);
    let second = i64::from(time & 0x1F) * 2;

    let months = year * 12 + month - 1;
    let first_of_month =
        NaiveDate::from_ymd_opt(months.div_euclid(12), months.rem_euclid(12) as u32 + 1, 1)?;

    let offset = TimeDelta::try_days(day - 1)?
        + TimeDelta::try_hours(hour)?
        + TimeDelta::try_minutes(minute)?
        + TimeDelta::try_seconds(second)?;

    first_of_month.and_hms_opt(0, 0, 0)?.checked_add_signed(offset)
}

/// Packs a calendar timestamp into FAT date and time fields.
///
/// Years outside the FAT range are clamped to its bounds.
pub fn datetime_to_fat(timestamp: NaiveDateTime) -> (u16, u16) {
    if timestamp.year() < FAT_EPOCH_YEAR {
        return ((1 << 5) | 1, 0);
    }
    if timestamp.year() > FAT_LAST_YEAR {
        return ((127 << 9) | (12 << 5) | 31, (23 << 11) | (59 << 5) | 29);
    }

    let date = ((timestamp.year() - FAT_EPOCH_YEAR) as u16) << 9
        | (timestamp.month() as u16) << 5
        | timestamp.day() as u16;
    let time = (timestamp.hour() as u16) << 11
        | (timestamp.minute() as u16) << 5
        | (timestamp.second() / 2) as u16;

    (date, time)
}

/// RFC 3659 `modify` fact for packed FAT fields.
pub fn fat_timestamp(date: u16, time: u16) -> String {
    fat_to_datetime(date, time)
        .map(|timestamp| timestamp.format(MLSD_TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| "19800101000000".to_string())
}

/// MLSD lines for `entries` of directory `cwd`, synthetic entries first.
pub fn mlsd_lines(cwd: &str, entries: &[DirEntry]) -> Vec<String> {
    let mut lines = Vec::with_capacity(entries.len() + 2);
    lines.push(format!("Type=cdir;Perm=cmpel; {cwd}"));
    lines.push("Type=pdir;Perm=el; ..".to_string());
    lines.extend(entries.iter().map(mlsd_entry));
    lines
}

fn mlsd_entry(entry: &DirEntry) -> String {
    let modify = fat_timestamp(entry.modify_date, entry.modify_time);
    if entry.is_dir {
        format!("Type=dir;modify={modify};Perm=cpmel; {}", entry.name)
    } else {
        format!(
            "Type=file;Size={};modify={modify};Perm=adfrw; {}",
            entry.size, entry.name
        )
    }
}

/// NLST lines: one bare name per entry.
pub fn nlst_lines(entries: &[DirEntry]) -> Vec<String> {
    entries.iter().map(|entry| entry.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, is_dir: bool, size: u64) -> DirEntry {
        DirEntry {
            name: name.to_string(),
            is_dir,
            size,
            // 2023-07-14 13:45:30
            modify_date: (43 << 9) | (7 << 5) | 14,
            modify_time: (13 << 11) | (45 << 5) | 15,
        }
    }

    #[test]
    fn test_fat_timestamp_decodes_packed_fields() {
        let e = entry("a", false, 0);
        assert_eq!(fat_timestamp(e.modify_date, e.modify_time), "20230714134530");
    }

    #[test]
    fn test_fat_timestamp_normalises_zero_fields() {
        // Month 0, day 0 of 1981 is 30 November 1980.
        assert_eq!(fat_timestamp(1 << 9, 0), "19801130000000");
        // 24:00 rolls over to the next day.
        assert_eq!(fat_timestamp((1 << 5) | 1, 24 << 11), "19800102000000");
    }

    #[test]
    fn test_datetime_to_fat_inverts_decode() {
        let timestamp = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(23, 59, 58)
            .unwrap();
        let (date, time) = datetime_to_fat(timestamp);
        assert_eq!(fat_to_datetime(date, time), Some(timestamp));
    }

    #[test]
    fn test_datetime_to_fat_clamps_to_epoch() {
        let timestamp = NaiveDate::from_ymd_opt(1970, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let (date, time) = datetime_to_fat(timestamp);
        assert_eq!(fat_timestamp(date, time), "19800101000000");
    }

    #[test]
    fn test_mlsd_lines_start_with_synthetic_entries() {
        let lines = mlsd_lines(
            "/data",
            &[entry("logs", true, 0), entry("boot.txt", false, 100)],
        );
        assert_eq!(
            lines,
            vec![
                "Type=cdir;Perm=cmpel; /data",
                "Type=pdir;Perm=el; ..",
                "Type=dir;modify=20230714134530;Perm=cpmel; logs",
                "Type=file;Size=100;modify=20230714134530;Perm=adfrw; boot.txt",
            ]
        );
    }

    #[test]
    fn test_nlst_lines_are_bare_names() {
        let lines = nlst_lines(&[entry("logs", true, 0), entry("boot.txt", false, 100)]);
        assert_eq!(lines, vec!["logs", "boot.txt"]);
    }
}
