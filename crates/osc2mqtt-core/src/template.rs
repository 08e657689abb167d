//! Output identifier templates.
//!
//! `{0}`, `{1}`, ... bind to positional capture groups, `{name}` to named
//! groups and `{_values}` to the whole value sequence. Unmatched or
//! unknown groups render as empty strings. `{{` and `}}` are literal
//! braces. Rendering is pure substitution; no coercion happens here.

use crate::matcher::CapturedGroups;
use crate::value::{self, Value};

/// Substitute captures and values into an identifier template.
pub fn render(template: &str, captures: &CapturedGroups, values: &[Value]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut token = String::new();
                let mut closed = false;
                for t in chars.by_ref() {
                    if t == '}' {
                        closed = true;
                        break;
                    }
                    token.push(t);
                }
                if !closed {
                    // Unterminated placeholder: emit as written.
                    out.push('{');
                    out.push_str(&token);
                    break;
                }
                expand(&mut out, &token, captures, values);
            }
            _ => out.push(c),
        }
    }
    out
}

fn expand(out: &mut String, token: &str, captures: &CapturedGroups, values: &[Value]) {
    if token == "_values" {
        out.push_str(&value::render_sequence(values));
    } else if let Ok(index) = token.parse::<usize>() {
        out.push_str(captures.positional(index));
    } else {
        out.push_str(captures.named(token));
    }
}
