//! Parser for the action text an agent's model replies with.
//!
//! A reply is free-form reasoning followed by one call, either
//! `do(action="Tap", element=[499,966])` or `finish(message="...")`.
//! The last call in the reply is the one that counts.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

use super::{AgentError, AgentResult};

/// `key="string"` or `key=[x, y]`
static ARG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\w+)\s*=\s*(?:"((?:[^"\\]|\\.)*)"|\[\s*(-?\d+)\s*,\s*(-?\d+)\s*\])"#)
        .expect("argument pattern is valid")
});

/// A decoded agent action, coordinates as written by the model
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Tap { x: i32, y: i32 },
    DoubleTap { x: i32, y: i32 },
    LongPress { x: i32, y: i32 },
    Swipe { start: (i32, i32), end: (i32, i32) },
    Type { text: String },
    Launch { app: String },
    Back,
    Home,
    Wait { seconds: f64 },
    /// Model asks a human to take over; the run stops without finishing
    TakeOver { message: String },
    /// Bookkeeping actions with no device effect (Note, Call_API, Interact)
    Note { name: String },
    Finish { message: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
enum ArgValue {
    Text(String),
    Point(i32, i32),
}

/// Parse the action out of a model reply
pub fn parse(reply: &str) -> AgentResult<Action> {
    let (kind, call) =
        last_call(reply).ok_or_else(|| malformed(reply, "no do(...) or finish(...) call"))?;
    let args = parse_args(call);

    if kind == CallKind::Finish {
        return Ok(Action::Finish {
            message: text_arg(&args, "message"),
        });
    }

    let name =
        text_arg(&args, "action").ok_or_else(|| malformed(reply, "do(...) without action="))?;
    let point = |key: &str| -> AgentResult<(i32, i32)> {
        match args.get(key) {
            Some(ArgValue::Point(x, y)) => Ok((*x, *y)),
            _ => Err(malformed(reply, &format!("{} requires {}=[x,y]", name, key))),
        }
    };

    let action = match name.as_str() {
        "Tap" => {
            let (x, y) = point("element")?;
            Action::Tap { x, y }
        }
        "Double Tap" => {
            let (x, y) = point("element")?;
            Action::DoubleTap { x, y }
        }
        "Long Press" => {
            let (x, y) = point("element")?;
            Action::LongPress { x, y }
        }
        "Swipe" => Action::Swipe {
            start: point("start")?,
            end: point("end")?,
        },
        "Type" | "Type_Name" => Action::Type {
            text: text_arg(&args, "text").unwrap_or_default(),
        },
        "Launch" => Action::Launch {
            app: text_arg(&args, "app")
                .ok_or_else(|| malformed(reply, "Launch requires app=\"...\""))?,
        },
        "Back" => Action::Back,
        "Home" => Action::Home,
        "Wait" => Action::Wait {
            seconds: text_arg(&args, "duration")
                .as_deref()
                .and_then(leading_number)
                .unwrap_or(1.0),
        },
        "Take_over" => Action::TakeOver {
            message: text_arg(&args, "message").unwrap_or_default(),
        },
        "Note" | "Call_API" | "Interact" => Action::Note { name: name.clone() },
        _ => return Err(AgentError::UnknownAction(name.clone())),
    };
    Ok(action)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Do,
    Finish,
}

const CALLS: [(CallKind, &str); 2] = [(CallKind::Do, "do("), (CallKind::Finish, "finish(")];

/// Locate the last `do(` / `finish(` call and return its argument text.
///
/// Calls are consumed left to right and each one's argument list is skipped
/// whole, so call-like text inside a quoted argument is never a call.
fn last_call(reply: &str) -> Option<(CallKind, &str)> {
    let mut found = None;
    let mut from = 0;
    while let Some((kind, args_start)) = next_call(reply, from) {
        let Some(len) = closing_paren(&reply[args_start..]) else {
            break;
        };
        found = Some((kind, &reply[args_start..args_start + len]));
        from = args_start + len + 1;
    }
    found
}

/// Earliest call at or after `from`; returns its kind and where its arguments begin
fn next_call(reply: &str, from: usize) -> Option<(CallKind, usize)> {
    CALLS
        .into_iter()
        .filter_map(|(kind, token)| {
            reply[from..]
                .match_indices(token)
                .map(|(i, _)| from + i)
                .find(|&i| !is_identifier_tail(reply, i))
                .map(|i| (i, kind, i + token.len()))
        })
        .min_by_key(|(start, _, _)| *start)
        .map(|(_, kind, args_start)| (kind, args_start))
}

/// Whether the text at `i` continues a longer identifier (`undo(`)
fn is_identifier_tail(reply: &str, i: usize) -> bool {
    reply[..i]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Offset of the `)` closing an argument list, ignoring parentheses in strings
fn closing_paren(args: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in args.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn parse_args(call: &str) -> HashMap<String, ArgValue> {
    ARG.captures_iter(call)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str().to_string();
            let value = match (caps.get(2), caps.get(3), caps.get(4)) {
                (Some(text), _, _) => ArgValue::Text(unescape(text.as_str())),
                (None, Some(x), Some(y)) => {
                    ArgValue::Point(x.as_str().parse().ok()?, y.as_str().parse().ok()?)
                }
                _ => return None,
            };
            Some((key, value))
        })
        .collect()
}

fn text_arg(args: &HashMap<String, ArgValue>, key: &str) -> Option<String> {
    match args.get(key) {
        Some(ArgValue::Text(s)) => Some(s.clone()),
        _ => None,
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// "2 seconds" -> 2.0
fn leading_number(s: &str) -> Option<f64> {
    let end = s
        .trim_start()
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.trim_start().len());
    s.trim_start()[..end].parse().ok()
}

fn malformed(reply: &str, reason: &str) -> AgentError {
    AgentError::MalformedAction {
        reply: reply.to_string(),
        reason: reason.to_string(),
    }
}
