//! Parser and serializer for the properties text format.
//!
//! The format is the classic line-oriented `key=value` encoding: `=`, `:` or
//! unescaped whitespace separate key and value, `#`/`!` start comment lines,
//! a line ending in an odd number of backslashes continues onto the next
//! line, and `\t` `\n` `\f` `\r` `\\` `\uXXXX` escapes are honored. Output
//! is UTF-8; `\uXXXX` is accepted on load so files written by legacy tools
//! remain readable, but non-ASCII characters are not widened on write.

use std::collections::HashMap;
use std::io;
use std::str::Chars;

use prefstore_base::error::ErrorKind;
use prefstore_base::{PrefsError, PrefsResult};

/// Parses properties text into a key/value mapping.
///
/// Later occurrences of a key overwrite earlier ones. Returns a
/// [`ErrorKind::Syntax`] error carrying the line number of the offending
/// logical line if an escape sequence is malformed.
pub fn parse(text: &str) -> PrefsResult<HashMap<String, String>> {
    let mut entries = HashMap::new();
    let mut lines = text.lines().enumerate();

    while let Some((index, raw)) = lines.next() {
        let line = raw.trim_start_matches([' ', '\t', '\x0c']);
        if line.is_empty() || line.starts_with(['#', '!']) {
            continue;
        }

        // 1-indexed number of the first natural line of this logical line
        let line_number = index + 1;

        // A trailing odd run of backslashes joins the next natural line,
        // with its leading whitespace dropped.
        let mut logical = line.to_string();
        while ends_with_odd_backslash_run(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, continuation)) => {
                    logical.push_str(continuation.trim_start_matches([' ', '\t', '\x0c']));
                }
                None => break,
            }
        }

        let (raw_key, raw_value) = split_entry(&logical);
        let key = unescape(raw_key, line_number)?;
        let value = unescape(raw_value, line_number)?;
        entries.insert(key, value);
    }

    Ok(entries)
}

/// Serializes a mapping to properties text.
///
/// Keys are emitted in sorted order so output is deterministic. When
/// `comment` is given, each of its lines is written first, prefixed with
/// `#`.
pub fn serialize(entries: &HashMap<String, String>, comment: Option<&str>) -> String {
    let mut out = String::new();

    if let Some(comment) = comment {
        for line in comment.lines() {
            out.push('#');
            out.push_str(line);
            out.push('\n');
        }
    }

    let mut keys: Vec<&String> = entries.keys().collect();
    keys.sort();
    for key in keys {
        out.push_str(&escape(key, true));
        out.push('=');
        out.push_str(&escape(&entries[key], false));
        out.push('\n');
    }

    out
}

/// Serializes a mapping and writes it through `writer`.
///
/// Same output as [`serialize`]; the caller decides how to report the
/// underlying I/O error.
pub fn store<W: io::Write>(
    mut writer: W,
    entries: &HashMap<String, String>,
    comment: Option<&str>,
) -> io::Result<()> {
    writer.write_all(serialize(entries, comment).as_bytes())?;
    writer.flush()
}

fn ends_with_odd_backslash_run(s: &str) -> bool {
    s.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Splits a logical line into raw (still escaped) key and value slices.
///
/// The key ends at the first unescaped `=`, `:` or whitespace character.
/// Whitespace around the separator belongs to neither side; at most one
/// `=`/`:` is consumed as the separator.
fn split_entry(logical: &str) -> (&str, &str) {
    let bytes = logical.as_bytes();
    let len = bytes.len();

    let mut key_end = len;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' => escaped = true,
            b'=' | b':' | b' ' | b'\t' | b'\x0c' => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let mut value_start = key_end;
    let mut seen_separator = false;
    while value_start < len {
        match bytes[value_start] {
            b' ' | b'\t' | b'\x0c' => value_start += 1,
            b'=' | b':' if !seen_separator => {
                seen_separator = true;
                value_start += 1;
            }
            _ => break,
        }
    }

    (&logical[..key_end], &logical[value_start..])
}

fn syntax_error(line: usize) -> Box<PrefsError> {
    Box::new(PrefsError::new(ErrorKind::Syntax {
        line,
        message: "malformed \\uXXXX escape".to_string(),
    }))
}

/// Resolves escape sequences in a raw key or value slice.
fn unescape(input: &str, line: usize) -> PrefsResult<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            // A lone trailing backslash carries no information
            None => break,
            Some('u') => out.push(decode_unicode_escape(&mut chars, line)?),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('f') => out.push('\x0c'),
            Some('r') => out.push('\r'),
            // Any other escaped character stands for itself
            Some(other) => out.push(other),
        }
    }

    Ok(out)
}

/// Decodes the `XXXX` of a `\uXXXX` escape, combining UTF-16 surrogate
/// pairs written as two consecutive escapes.
fn decode_unicode_escape(chars: &mut Chars<'_>, line: usize) -> PrefsResult<char> {
    let unit = decode_hex4(chars, line)?;

    if (0xD800..=0xDBFF).contains(&unit) {
        // High surrogate, must be followed by an escaped low surrogate
        if chars.next() != Some('\\') || chars.next() != Some('u') {
            return Err(syntax_error(line));
        }
        let low = decode_hex4(chars, line)?;
        if !(0xDC00..=0xDFFF).contains(&low) {
            return Err(syntax_error(line));
        }
        let combined = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
        return char::from_u32(combined).ok_or_else(|| syntax_error(line));
    }
    if (0xDC00..=0xDFFF).contains(&unit) {
        // Unpaired low surrogate
        return Err(syntax_error(line));
    }
    char::from_u32(unit).ok_or_else(|| syntax_error(line))
}

fn decode_hex4(chars: &mut Chars<'_>, line: usize) -> PrefsResult<u32> {
    let mut value: u32 = 0;
    for _ in 0..4 {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| syntax_error(line))?;
        value = value * 16 + digit;
    }
    Ok(value)
}

/// Escapes a key or value for output.
///
/// Keys escape every space; values only a leading space, so embedded spaces
/// stay readable while the separator scan on reload stays unambiguous.
fn escape(input: &str, escape_all_spaces: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for (i, c) in input.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            ' ' if escape_all_spaces || i == 0 => out.push_str("\\ "),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            // Remaining control characters would survive a round trip raw,
            // but are written as \uXXXX to keep the file printable
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            _ => out.push(c),
        }
    }
    out
}
