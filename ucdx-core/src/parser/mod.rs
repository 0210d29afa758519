//! One-pass parser for UCD text files.
//!
//! The grammar is line oriented: an optional block of `#` header comments
//! (some of which are directives), `@` segment markers, and
//! semicolon-delimited data rows. Entries are produced in source order,
//! whether they come from data rows, `# Property:` lines, or `# @missing:`
//! directives.

mod cursor;
mod directive;
mod fields;

use cursor::Cursor;
use ucdx_common::error::ParseError;
use ucdx_common::model::UcdFile;

/// Parse the complete text of a UCD file.
///
/// Pure and stateless: identical input always yields a structurally
/// identical [`UcdFile`], and concurrent calls on independent inputs share
/// nothing. The whole input must be consumed; any line that fits no
/// production fails with a [`ParseError`] carrying the offending position,
/// and no partial result is ever returned.
pub fn parse(text: &str) -> Result<UcdFile, ParseError> {
    let mut file = UcdFile::default();
    let mut segment: Option<String> = None;

    for (idx, raw) in text.split('\n').enumerate() {
        let line_no = idx + 1;
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        reject_control_chars(line, line_no)?;

        let mut cur = Cursor::new(line, line_no);
        cur.skip_spaces();
        match cur.peek() {
            None => {}
            Some('#') => {
                cur.bump();
                directive::comment_line(&mut file, segment.as_deref(), &mut cur)?;
            }
            Some('@') => {
                cur.bump();
                segment = Some(directive::segment_marker(&mut cur)?);
            }
            Some(_) => {
                let entry = fields::data_entry(&mut cur, segment.as_deref())?;
                file.entries.push(entry);
            }
        }
    }
    Ok(file)
}

fn reject_control_chars(line: &str, line_no: usize) -> Result<(), ParseError> {
    for (i, c) in line.chars().enumerate() {
        if c.is_control() && c != '\t' {
            return Err(ParseError::new(line_no, i + 1, "printable character"));
        }
    }
    Ok(())
}
