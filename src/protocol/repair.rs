//! Best-effort repair of near-valid JSON text.
//!
//! Repair only fixes damage caused by cutting a record at an arbitrary byte
//! offset or by stray bytes around it:
//!
//! - leading bytes before the first `{` or `[`,
//! - trailing bytes after the top-level value closes, unless they open a
//!   second object or array,
//! - an unterminated string (including a dangling escape),
//! - a dangling `,`, `:` or object key,
//! - unclosed objects and arrays.
//!
//! It makes no attempt to recover truncated literals (`tru`, `12.`) or to
//! reinterpret mismatched brackets. A repaired record can carry a truncated
//! payload: repair mitigates split boundaries, it does not make the stream
//! correct.

/// Inputs longer than this are never repaired.
pub const MAX_REPAIR_BYTES: usize = 64 * 1024;

/// An open container and, for objects, whether a value is expected next.
struct Open {
    close: char,
    expect_value: bool,
}

/// Attempt to turn `raw` into syntactically complete JSON text.
///
/// Returns `None` when the input is empty, larger than
/// [`MAX_REPAIR_BYTES`], contains no object or array, has mismatched
/// brackets, or holds more than one top-level value. A `Some` result is
/// not guaranteed to parse.
#[must_use]
pub fn repair(raw: &str) -> Option<String> {
    let text = raw.trim().trim_start_matches('\u{feff}');
    if text.is_empty() || text.len() > MAX_REPAIR_BYTES {
        return None;
    }

    let start = text.find(['{', '['])?;
    let mut out = String::with_capacity(text.len() + 8);
    let mut stack: Vec<Open> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    let body = &text[start..];
    for (offset, ch) in body.char_indices() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            '{' => {
                stack.push(Open {
                    close: '}',
                    expect_value: false,
                });
                out.push(ch);
            }
            '[' => {
                stack.push(Open {
                    close: ']',
                    expect_value: true,
                });
                out.push(ch);
            }
            ':' => {
                if let Some(top) = stack.last_mut() {
                    top.expect_value = true;
                }
                out.push(ch);
            }
            ',' => {
                if let Some(top) = stack.last_mut() {
                    top.expect_value = top.close == ']';
                }
                out.push(ch);
            }
            '}' | ']' => {
                let open = stack.pop()?;
                if open.close != ch {
                    return None;
                }
                strip_trailing_comma(&mut out);
                out.push(ch);
                if stack.is_empty() {
                    // Stray bytes are dropped; a second value is not.
                    let tail = &body[offset + ch.len_utf8()..];
                    if tail.contains(['{', '[']) {
                        return None;
                    }
                    return Some(out);
                }
            }
            _ => out.push(ch),
        }
    }

    if in_string {
        if escaped {
            out.pop();
        }
        strip_partial_unicode_escape(&mut out);
        out.push('"');
    }

    close_dangling(&mut out, stack.last());
    while let Some(open) = stack.pop() {
        strip_trailing_comma(&mut out);
        out.push(open.close);
    }

    Some(out)
}

/// Complete a member or element cut off at end of input.
fn close_dangling(out: &mut String, top: Option<&Open>) {
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);

    if out.ends_with(':') {
        out.push_str("null");
        return;
    }

    if let Some(open) = top {
        // `{"a":1,"b"` ends on a key with no value.
        if open.close == '}' && !open.expect_value && out.ends_with('"') {
            out.push_str(":null");
        }
    }
}

fn strip_trailing_comma(out: &mut String) {
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    if out.ends_with(',') {
        out.pop();
    }
}

/// Drop a `\u` escape that lost some of its four hex digits.
fn strip_partial_unicode_escape(out: &mut String) {
    let bytes = out.as_bytes();
    let hex_tail = bytes
        .iter()
        .rev()
        .take_while(|b| b.is_ascii_hexdigit())
        .count();
    if hex_tail > 3 {
        return;
    }

    let u_pos = bytes.len() - hex_tail;
    if u_pos < 2 || bytes[u_pos - 1] != b'u' {
        return;
    }

    let slashes = bytes[..u_pos - 1]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count();
    if slashes % 2 == 1 {
        out.truncate(u_pos - 2);
    }
}
