//! Text format for `ConfigFile`: INI-style sections of `key=value` lines.

use std::fmt::Write;

use crate::state::{ConfigData, Value};

/// Serialize sections in key order.
pub fn encode(data: &ConfigData) -> String {
    let mut out = String::new();
    for (i, (section, entries)) in data.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "[{section}]");
        out.push('\n');
        for (key, value) in entries {
            let _ = writeln!(out, "{key}={}", encode_value(value));
        }
    }
    out
}

fn encode_value(value: &Value) -> String {
    match value {
        Value::Nil | Value::Object(_) => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => {
            let text = f.to_string();
            if text.contains(['.', 'e', 'i', 'N']) {
                text
            } else {
                format!("{text}.0")
            }
        }
        Value::Str(s) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('"');
            for ch in s.chars() {
                match ch {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    _ => out.push(ch),
                }
            }
            out.push('"');
            out
        }
    }
}

/// Parse config text. On failure returns the 1-based line number.
pub fn parse(text: &str) -> Result<ConfigData, usize> {
    let mut data = ConfigData::new();
    let mut section = String::new();
    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix('[') {
            let name = rest.strip_suffix(']').ok_or(line_no)?;
            if name.is_empty() {
                return Err(line_no);
            }
            section = name.to_owned();
            data.entry(section.clone()).or_default();
            continue;
        }
        let (key, value) = line.split_once('=').ok_or(line_no)?;
        let key = key.trim();
        if key.is_empty() {
            return Err(line_no);
        }
        let value = parse_value(value.trim()).ok_or(line_no)?;
        data.entry(section.clone())
            .or_default()
            .insert(key.to_owned(), value);
    }
    Ok(data)
}

fn parse_value(text: &str) -> Option<Value> {
    match text {
        "null" => return Some(Value::Nil),
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        _ => {}
    }
    if let Some(body) = text.strip_prefix('"') {
        let body = body.strip_suffix('"')?;
        let mut out = String::with_capacity(body.len());
        let mut chars = body.chars();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                match chars.next()? {
                    'n' => out.push('\n'),
                    other => out.push(other),
                }
            } else if ch == '"' {
                return None;
            } else {
                out.push(ch);
            }
        }
        return Some(Value::Str(out));
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::Int(i));
    }
    text.parse::<f64>().ok().map(Value::Float)
}
