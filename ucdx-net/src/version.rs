use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use semver::Version;
use ucdx_common::error::{Result, UcdError};

/// Release metadata extracted from the UCD's `ReadMe.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UcdVersion {
    pub date: DateTime<Utc>,
    pub version: Version,
    pub etag: String,
    pub last_modified: String,
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^# Date: (\d+)-(\d+)-(\d+)").unwrap())
}

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Version (\d+\.\d+\.\d+) of").unwrap())
}

/// Extract the release date and 3-part version from ReadMe.txt text.
///
/// The two patterns are independent; a ReadMe missing either is a
/// [`UcdError::BadReadme`], which is deliberately distinct from any
/// transport or cache failure.
pub(crate) fn scan_readme(text: &str) -> Result<(DateTime<Utc>, Version)> {
    let date_caps = date_re()
        .captures(text)
        .ok_or_else(|| UcdError::BadReadme("no '# Date:' line".to_string()))?;
    let ymd: std::result::Result<Vec<u32>, _> = (1..=3)
        .map(|i| date_caps[i].parse::<u32>())
        .collect();
    let ymd = ymd.map_err(|_| UcdError::BadReadme("unreadable date".to_string()))?;
    let date = NaiveDate::from_ymd_opt(ymd[0] as i32, ymd[1], ymd[2])
        .ok_or_else(|| UcdError::BadReadme(format!("impossible date {ymd:?}")))?
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| UcdError::BadReadme("impossible date".to_string()))?
        .and_utc();

    let version_caps = version_re()
        .captures(text)
        .ok_or_else(|| UcdError::BadReadme("no version declaration".to_string()))?;
    let version = Version::parse(&version_caps[1])?;

    Ok((date, version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const README: &str = "\
# Date: 2023-08-28
# \u{a9} 2023 Unicode\u{ae}, Inc.
# Unicode character database
The UCD files in this directory are for
Version 15.1.0 of the Unicode Standard.
";

    #[test]
    fn scans_date_and_version() {
        let (date, version) = scan_readme(README).unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2023, 8, 28, 0, 0, 0).unwrap());
        assert_eq!(version, Version::new(15, 1, 0));
    }

    #[test]
    fn version_match_is_case_insensitive() {
        let text = "# Date: 2023-08-28\nfor version 15.1.0 of the standard";
        let (_, version) = scan_readme(text).unwrap();
        assert_eq!(version, Version::new(15, 1, 0));
    }

    #[test]
    fn missing_date_is_bad_readme() {
        let err = scan_readme("Version 15.1.0 of the Unicode Standard.").unwrap_err();
        assert!(matches!(err, UcdError::BadReadme(_)));
    }

    #[test]
    fn missing_version_is_bad_readme() {
        let err = scan_readme("# Date: 2023-08-28\nno version here").unwrap_err();
        assert!(matches!(err, UcdError::BadReadme(_)));
    }

    #[test]
    fn date_line_must_start_a_line() {
        let err = scan_readme("x # Date: 2023-08-28\nVersion 15.1.0 of x").unwrap_err();
        assert!(matches!(err, UcdError::BadReadme(_)));
    }
}
