// Header-comment directives and segment markers.
//
// Like the rest of the grammar this is ordered choice: a comment line is
// tried against each directive shape and falls back to an ignored plain
// comment, EXCEPT that the `@missing:`, `Date:`, `Property:` and
// `Derived Property:` prefixes commit, so a malformed body under them is a
// parse error rather than silently skipped.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use semver::Version;
use ucdx_common::error::ParseError;
use ucdx_common::model::{Entry, FieldDef, UcdFile};

use super::cursor::{is_word_char, Cursor};
use super::fields;

const ORDINALS: [&str; 15] = [
    "first",
    "second",
    "third",
    "fourth",
    "fifth",
    "sixth",
    "seventh",
    "eighth",
    "ninth",
    "tenth",
    "eleventh",
    "twelfth",
    "thirteenth",
    "fourteenth",
    "fifteenth",
];

/// Process one comment line. `cur` is positioned just after the `#`.
pub fn comment_line(
    file: &mut UcdFile,
    segment: Option<&str>,
    cur: &mut Cursor,
) -> Result<(), ParseError> {
    cur.skip_spaces();

    if cur.eat_str("@missing:") {
        let entry = missing_directive(cur, segment)?;
        file.entries.push(entry);
        return Ok(());
    }
    if cur.eat_str("Date:") {
        let date = date_directive(cur)?;
        if file.date.is_none() {
            file.date = Some(date);
        }
        return Ok(());
    }
    if cur.eat_str("Derived Property:") {
        let entry = property_entry(cur, segment, true)?;
        file.entries.push(entry);
        return Ok(());
    }
    if cur.eat_str("Property:") {
        let entry = property_entry(cur, segment, false)?;
        file.entries.push(entry);
        return Ok(());
    }
    if field_def(file, cur)? {
        return Ok(());
    }
    name_line(file, cur.rest());
    Ok(())
}

/// `@<identifier>` segment marker; `cur` is positioned just after the `@`.
/// A trailing `#` comment is allowed and discarded.
pub fn segment_marker(cur: &mut Cursor) -> Result<String, ParseError> {
    let ident = cur.take_word();
    if ident.is_empty() {
        return Err(cur.error("segment identifier"));
    }
    cur.skip_spaces();
    if cur.eat('#') {
        cur.consume_rest();
    }
    if !cur.at_end() {
        return Err(cur.error("segment identifier of word characters"));
    }
    Ok(ident.to_string())
}

/// `# @missing: <range>; <value>[; <value>...]` with an optional trailing
/// comment. The current segment applies to the produced entry.
fn missing_directive(cur: &mut Cursor, segment: Option<&str>) -> Result<Entry, ParseError> {
    cur.skip_spaces();
    let mut missing_fields = vec![fields::range(cur)?];
    let comment = fields::field_tail(cur, &mut missing_fields)?;
    if missing_fields.len() < 2 {
        return Err(cur.error("';' followed by at least one value"));
    }
    Ok(Entry {
        fields: missing_fields,
        missing: true,
        comment,
        segment: segment.map(str::to_string),
        ..Entry::default()
    })
}

/// `# Date: YYYY-MM-DD[, HH:MM:SS[ TZ...]]`, always read as UTC. A
/// timezone token and anything after it are accepted and ignored; real
/// files carry editor initials there.
fn date_directive(cur: &mut Cursor) -> Result<DateTime<Utc>, ParseError> {
    cur.skip_spaces();
    let date = calendar_date(cur)?;
    let mut time = NaiveTime::MIN;
    if cur.eat(',') {
        cur.skip_spaces();
        time = clock_time(cur)?;
        cur.consume_rest();
    } else {
        cur.skip_spaces();
        if !cur.at_end() {
            return Err(cur.error("',' followed by a time, or end of line"));
        }
    }
    Ok(NaiveDateTime::new(date, time).and_utc())
}

fn calendar_date(cur: &mut Cursor) -> Result<NaiveDate, ParseError> {
    let start = cur.clone();
    let year = int_field(cur, 4, 4, "four-digit year")?;
    if !cur.eat('-') {
        return Err(cur.error("'-'"));
    }
    let month = int_field(cur, 1, 2, "month")?;
    if !cur.eat('-') {
        return Err(cur.error("'-'"));
    }
    let day = int_field(cur, 1, 2, "day")?;
    NaiveDate::from_ymd_opt(year as i32, month, day)
        .ok_or_else(|| start.error("valid calendar date"))
}

fn clock_time(cur: &mut Cursor) -> Result<NaiveTime, ParseError> {
    let start = cur.clone();
    let hour = int_field(cur, 1, 2, "hour")?;
    if !cur.eat(':') {
        return Err(cur.error("':'"));
    }
    let minute = int_field(cur, 1, 2, "minute")?;
    if !cur.eat(':') {
        return Err(cur.error("':'"));
    }
    let second = int_field(cur, 1, 2, "second")?;
    NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(|| start.error("valid time"))
}

fn int_field(
    cur: &mut Cursor,
    min_len: usize,
    max_len: usize,
    what: &str,
) -> Result<u32, ParseError> {
    let start = cur.clone();
    let digits = cur.take_while(|c| c.is_ascii_digit());
    if digits.len() < min_len || digits.len() > max_len {
        return Err(start.error(what));
    }
    digits.parse().map_err(|_| start.error(what))
}

/// `# Property: <name>` / `# Derived Property: <name> (<trailing>)`.
/// Opens an entry with no fields; the parenthetical is kept verbatim.
fn property_entry(
    cur: &mut Cursor,
    segment: Option<&str>,
    derived: bool,
) -> Result<Entry, ParseError> {
    cur.skip_spaces();
    let name = cur.take_word();
    if name.is_empty() {
        return Err(cur.error("property name"));
    }
    cur.skip_spaces();
    let comment = if cur.at_end() {
        None
    } else if cur.peek() == Some('(') {
        let text = cur.consume_rest().trim_end();
        if !text.ends_with(')') {
            return Err(cur.error("')'"));
        }
        Some(text.to_string())
    } else {
        return Err(cur.error("parenthetical comment or end of line"));
    };
    Ok(Entry {
        property: Some(name.to_string()),
        derived,
        comment,
        segment: segment.map(str::to_string),
        ..Entry::default()
    })
}

/// Field-definition lines in both phrasings: `# Second field: ...` and
/// `# field 2: ...`, 1-based, normalized to the same 0-based ordinal.
///
/// Candidates that stop matching before the colon (prose like
/// `# Field 1 is ...`) fall back to a plain comment, mirroring the ordered
/// choice of the grammar.
fn field_def(file: &mut UcdFile, cur: &mut Cursor) -> Result<bool, ParseError> {
    let mut probe = cur.clone();
    let word = probe.take_word();
    if word.is_empty() {
        return Ok(false);
    }

    if word.eq_ignore_ascii_case("field") {
        probe.skip_spaces();
        let digits_start = probe.clone();
        let digits = probe.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            return Ok(false);
        }
        probe.skip_spaces();
        if !probe.eat(':') {
            return Ok(false);
        }
        let ordinal: usize = digits
            .parse()
            .map_err(|_| digits_start.error("field number"))?;
        if ordinal == 0 {
            // `field N` is 1-based; a zero here is prose, not a definition.
            return Ok(false);
        }
        store_def(file, ordinal - 1, &mut probe);
        *cur = probe;
        return Ok(true);
    }

    let lower = word.to_ascii_lowercase();
    if let Some(ordinal) = ORDINALS.iter().position(|o| *o == lower) {
        probe.skip_spaces();
        let keyword = probe.take_word();
        if !keyword.eq_ignore_ascii_case("field") {
            return Ok(false);
        }
        probe.skip_spaces();
        if !probe.eat(':') {
            return Err(probe.error("':'"));
        }
        store_def(file, ordinal, &mut probe);
        *cur = probe;
        return Ok(true);
    }
    Ok(false)
}

fn store_def(file: &mut UcdFile, ordinal: usize, cur: &mut Cursor) {
    cur.skip_spaces();
    let description = cur.consume_rest().trim_end().to_string();
    let word = description
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_string();
    file.field_defs.insert(ordinal, FieldDef { word, description });
}

/// A comment that is just the file's own name, `Blocks-15.1.0.txt`, seeds
/// the version when nothing else has.
fn name_line(file: &mut UcdFile, content: &str) {
    if file.version.is_some() {
        return;
    }
    let trimmed = content.trim();
    let Some(stem) = trimmed.strip_suffix(".txt") else {
        return;
    };
    let Some((base, version)) = stem.rsplit_once('-') else {
        return;
    };
    if base.is_empty() || !base.chars().all(|c| is_word_char(c) || c == '-') {
        return;
    }
    let mut nums = version.split('.');
    let (Some(major), Some(minor), Some(patch)) = (nums.next(), nums.next(), nums.next()) else {
        return;
    };
    if nums.next().is_some() {
        return;
    }
    let (Ok(major), Ok(minor), Ok(patch)) = (
        major.parse::<u64>(),
        minor.parse::<u64>(),
        patch.parse::<u64>(),
    ) else {
        return;
    };
    file.version = Some(Version::new(major, minor, patch));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ucdx_common::model::Field;

    fn run(line: &str) -> Result<UcdFile, ParseError> {
        let mut file = UcdFile::default();
        let mut cur = Cursor::new(line, 1);
        assert!(cur.eat('#'));
        comment_line(&mut file, None, &mut cur)?;
        Ok(file)
    }

    #[test]
    fn date_with_time_and_annotations() {
        let file = run("# Date: 2016-06-01, 10:34:26 GMT [KW, LI]").unwrap();
        assert_eq!(
            file.date.unwrap(),
            Utc.with_ymd_and_hms(2016, 6, 1, 10, 34, 26).unwrap()
        );
    }

    #[test]
    fn bare_date_defaults_to_midnight() {
        let file = run("# Date: 2023-08-28").unwrap();
        assert_eq!(
            file.date.unwrap(),
            Utc.with_ymd_and_hms(2023, 8, 28, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn truncated_date_is_fatal() {
        let err = run("# Date: 2023-07").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.expected, "'-'");
    }

    #[test]
    fn impossible_date_is_fatal() {
        assert_eq!(
            run("# Date: 2023-13-01").unwrap_err().expected,
            "valid calendar date"
        );
    }

    #[test]
    fn lowercase_date_is_an_ordinary_comment() {
        let file = run("# date: not even a date").unwrap();
        assert!(file.date.is_none());
    }

    #[test]
    fn ordinal_and_numbered_phrasings_agree() {
        let mut file = UcdFile::default();
        let mut cur = Cursor::new("# Second field: Alias", 1);
        cur.eat('#');
        comment_line(&mut file, None, &mut cur).unwrap();
        let spelled = file.field_defs.get(&1).cloned().unwrap();

        let mut file2 = UcdFile::default();
        let mut cur = Cursor::new("# field 2: Alias", 1);
        cur.eat('#');
        comment_line(&mut file2, None, &mut cur).unwrap();
        assert_eq!(file2.field_defs.get(&1), Some(&spelled));
    }

    #[test]
    fn empty_description_keeps_empty_word() {
        let file = run("# Fourth field:").unwrap();
        let def = file.field_defs.get(&3).unwrap();
        assert_eq!(def.word, "");
        assert_eq!(def.description, "");
    }

    #[test]
    fn word_is_first_token_of_description() {
        let file = run("# First field:  Code point").unwrap();
        let def = file.field_defs.get(&0).unwrap();
        assert_eq!(def.word, "Code");
        assert_eq!(def.description, "Code point");
    }

    #[test]
    fn zero_based_prose_is_not_a_definition() {
        let file = run("# Field 0 is the code point in 4-digit hex").unwrap();
        assert!(file.field_defs.is_empty());
        let file = run("# field 0: zero").unwrap();
        assert!(file.field_defs.is_empty());
    }

    #[test]
    fn ordinal_without_colon_is_fatal() {
        assert_eq!(run("# First field Code point").unwrap_err().expected, "':'");
    }

    #[test]
    fn property_entries() {
        let file = run("# Property: White_Space").unwrap();
        let entry = &file.entries[0];
        assert_eq!(entry.property.as_deref(), Some("White_Space"));
        assert!(!entry.derived);
        assert!(entry.fields.is_empty());

        let file = run("# Derived Property: bar (no longer used)").unwrap();
        let entry = &file.entries[0];
        assert_eq!(entry.property.as_deref(), Some("bar"));
        assert!(entry.derived);
        assert_eq!(entry.comment.as_deref(), Some("(no longer used)"));
    }

    #[test]
    fn property_without_name_is_fatal() {
        assert_eq!(run("# Property: <").unwrap_err().expected, "property name");
    }

    #[test]
    fn missing_directive_entry() {
        let file = run("# @missing: 0000..10FFFF; Unassigned # comment").unwrap();
        let entry = &file.entries[0];
        assert!(entry.missing);
        assert_eq!(
            entry.fields,
            vec![
                Field::Range {
                    first: 0,
                    last: 0x10FFFF
                },
                Field::Text("Unassigned".into()),
            ]
        );
        assert_eq!(entry.comment.as_deref(), Some("comment"));
    }

    #[test]
    fn missing_directive_with_multiple_values() {
        let file = run("# @missing: 0000..10FFFF; NFD_QC; Yes").unwrap();
        assert_eq!(
            file.entries[0].fields,
            vec![
                Field::Range {
                    first: 0,
                    last: 0x10FFFF
                },
                Field::Text("NFD_QC".into()),
                Field::Text("Yes".into()),
            ]
        );
    }

    #[test]
    fn missing_directive_requires_range_and_value() {
        assert_eq!(run("# @missing: ").unwrap_err().expected, "code point");
        assert_eq!(run("# @missing: 0041; x").unwrap_err().expected, "'..'");
        assert_eq!(
            run("# @missing: 0000..10FFFF").unwrap_err().expected,
            "';' followed by at least one value"
        );
    }

    #[test]
    fn name_comment_seeds_version_once() {
        let mut file = run("# Blocks-15.1.0.txt").unwrap();
        assert_eq!(file.version, Some(Version::new(15, 1, 0)));

        // An earlier version wins.
        let mut cur = Cursor::new("# Scripts-16.0.0.txt", 2);
        cur.eat('#');
        comment_line(&mut file, None, &mut cur).unwrap();
        assert_eq!(file.version, Some(Version::new(15, 1, 0)));
    }

    #[test]
    fn near_miss_names_are_ignored() {
        assert!(run("# Blocks-15.txt").unwrap().version.is_none());
        assert!(run("# Blocks-15.1.0.html").unwrap().version.is_none());
        assert!(run("# 2023 Unicode, Inc.").unwrap().version.is_none());
    }

    #[test]
    fn segment_markers() {
        let mut cur = Cursor::new("@Part0", 1);
        cur.eat('@');
        assert_eq!(segment_marker(&mut cur).unwrap(), "Part0");

        let mut cur = Cursor::new("@Part1 # Character by character test", 1);
        cur.eat('@');
        assert_eq!(segment_marker(&mut cur).unwrap(), "Part1");

        let mut cur = Cursor::new("@<", 1);
        cur.eat('@');
        assert_eq!(
            segment_marker(&mut cur).unwrap_err().expected,
            "segment identifier"
        );

        let mut cur = Cursor::new("@Part 0", 1);
        cur.eat('@');
        assert_eq!(
            segment_marker(&mut cur).unwrap_err().expected,
            "segment identifier of word characters"
        );
    }
}
