// Data-row grammar: semicolon-delimited fields, code point tokens, and
// trailing comments.

use ucdx_common::error::ParseError;
use ucdx_common::model::{Entry, Field};

use super::cursor::{is_hex_char, is_word_char, Cursor};

const MAX_HEX_DIGITS: usize = 6;

/// Parse a whole data row. The leading field must be code points; the rest
/// are delimiter-split tokens. The current segment marker is attached.
pub fn data_entry(cur: &mut Cursor, segment: Option<&str>) -> Result<Entry, ParseError> {
    let mut fields = vec![code_points(cur)?];
    let comment = field_tail(cur, &mut fields)?;
    Ok(Entry {
        fields,
        segment: segment.map(str::to_string),
        comment,
        ..Entry::default()
    })
}

/// Remaining fields of a row that already has its leading field, plus the
/// optional trailing `#` comment. Positional indices are preserved: an
/// empty cell (including one produced by a trailing delimiter) becomes
/// [`Field::Absent`], never nothing.
pub fn field_tail(
    cur: &mut Cursor,
    fields: &mut Vec<Field>,
) -> Result<Option<String>, ParseError> {
    loop {
        cur.skip_spaces();
        match cur.peek() {
            None => return Ok(None),
            Some(';') => {
                cur.bump();
                fields.push(next_field(cur));
            }
            Some('#') => {
                cur.bump();
                return Ok(Some(cur.consume_rest().trim().to_string()));
            }
            Some(_) => return Err(cur.error("';', '#', or end of line")),
        }
    }
}

/// The leading field of a data row: single code point, space-separated
/// list, inclusive range, or a `<word>`-prefixed point list. Plain text is
/// not allowed here.
pub fn code_points(cur: &mut Cursor) -> Result<Field, ParseError> {
    cur.skip_spaces();
    if cur.eat('<') {
        let word = cur.take_word();
        if word.is_empty() {
            return Err(cur.error("prefix word"));
        }
        if !cur.eat('>') {
            return Err(cur.error("'>'"));
        }
        cur.skip_spaces();
        let mut points = vec![hex_token(cur)?];
        take_more_points(cur, &mut points)?;
        return Ok(Field::Points {
            points,
            prefix: Some(word.to_string()),
        });
    }

    let first = hex_token(cur)?;
    if cur.rest().starts_with("..") {
        cur.eat('.');
        cur.eat('.');
        let last = hex_token(cur)?;
        if first > last {
            return Err(cur.error("range with first <= last"));
        }
        return Ok(Field::Range { first, last });
    }

    let mut points = vec![first];
    take_more_points(cur, &mut points)?;
    Ok(Field::Points {
        points,
        prefix: None,
    })
}

/// `# @missing:` directives always carry a range, never a bare point.
pub fn range(cur: &mut Cursor) -> Result<Field, ParseError> {
    cur.skip_spaces();
    let first = hex_token(cur)?;
    if !cur.eat_str("..") {
        return Err(cur.error("'..'"));
    }
    let last = hex_token(cur)?;
    if first > last {
        return Err(cur.error("range with first <= last"));
    }
    Ok(Field::Range { first, last })
}

fn take_more_points(cur: &mut Cursor, points: &mut Vec<u32>) -> Result<(), ParseError> {
    loop {
        let save = cur.clone();
        cur.skip_spaces();
        match cur.peek() {
            Some(c) if is_hex_char(c) => points.push(hex_token(cur)?),
            _ => {
                *cur = save;
                return Ok(());
            }
        }
    }
}

fn hex_token(cur: &mut Cursor) -> Result<u32, ParseError> {
    let start = cur.clone();
    let digits = cur.take_while(is_hex_char);
    if digits.is_empty() {
        return Err(cur.error("code point"));
    }
    if digits.len() > MAX_HEX_DIGITS {
        return Err(start.error("code point of at most 6 hex digits"));
    }
    u32::from_str_radix(digits, 16).map_err(|_| start.error("code point"))
}

fn next_field(cur: &mut Cursor) -> Field {
    let token = cur.take_while(|c| c != ';' && c != '#');
    let token = token.trim();
    if token.is_empty() {
        Field::Absent
    } else {
        classify_token(token)
    }
}

/// Token-level reparse for non-leading fields. Hex tokens here require
/// 4-6 digits so short alphabetic values (`Cc`, `0`, `L`) stay textual;
/// anything that does not fully match a code point shape is plain text.
fn classify_token(token: &str) -> Field {
    match strict_code_points(token) {
        Some(field) => field,
        None => Field::Text(token.to_string()),
    }
}

fn strict_code_points(token: &str) -> Option<Field> {
    if let Some((a, b)) = token.split_once("..") {
        let first = strict_hex(a)?;
        let last = strict_hex(b)?;
        if first > last {
            return None;
        }
        return Some(Field::Range { first, last });
    }

    let mut parts = token.split_ascii_whitespace();
    let head = parts.next()?;
    let mut prefix = None;
    let mut points = Vec::new();
    match head.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        Some(inner) => {
            if inner.is_empty() || !inner.chars().all(is_word_char) {
                return None;
            }
            prefix = Some(inner.to_string());
        }
        None => points.push(strict_hex(head)?),
    }
    for part in parts {
        points.push(strict_hex(part)?);
    }
    if points.is_empty() {
        // A bare `<word>` token, like the `<control>` name in
        // UnicodeData.txt, is text.
        return None;
    }
    Some(Field::Points { points, prefix })
}

fn strict_hex(s: &str) -> Option<u32> {
    if (4..=MAX_HEX_DIGITS).contains(&s.len()) && s.chars().all(is_hex_char) {
        u32::from_str_radix(s, 16).ok()
    } else {
        None
    }
}
