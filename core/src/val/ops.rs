use std::rc::Rc;

use super::Val;

/// Float rendering used by `tostring` and concatenation.
pub fn format_float(n: f64) -> String {
    if n.is_nan() {
        return if n.is_sign_negative() { "-nan".into() } else { "nan".into() };
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf".into() } else { "-inf".into() };
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        let mut buf = itoa::Buffer::new();
        let mut out = String::from(buf.format(n as i64));
        if n == 0.0 && n.is_sign_negative() {
            out.insert(0, '-');
        }
        out.push_str(".0");
        return out;
    }
    let mut buf = ryu::Buffer::new();
    buf.format(n).to_string()
}

fn parse_number(text: &str) -> Option<Val> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Val::Int(i));
    }
    let (neg, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        let v = u64::from_str_radix(hex, 16).ok()? as i64;
        return Some(Val::Int(if neg { v.wrapping_neg() } else { v }));
    }
    let lower = digits.to_ascii_lowercase();
    if lower.starts_with("inf") || lower.starts_with("nan") {
        return None;
    }
    s.parse::<f64>().ok().map(Val::Number)
}

/// Numeric view of a value: numbers as-is, numeric strings parsed.
pub fn to_number(v: &Val) -> Option<Val> {
    match v {
        Val::Int(_) | Val::Number(_) => Some(v.clone()),
        Val::Str(s) => parse_number(s),
        _ => None,
    }
}

/// Integer view of a value; floats must be integral and in range.
pub fn to_integer(v: &Val) -> Option<i64> {
    match to_number(v)? {
        Val::Int(i) => Some(i),
        Val::Number(n) if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 => Some(n as i64),
        _ => None,
    }
}

pub(crate) fn to_float(v: &Val) -> Option<f64> {
    match to_number(v)? {
        Val::Int(i) => Some(i as f64),
        Val::Number(n) => Some(n),
        _ => None,
    }
}

/// String view used by concatenation: strings and numbers only.
pub(crate) fn to_concat_str(v: &Val) -> Option<Rc<str>> {
    match v {
        Val::Str(s) => Some(s.clone()),
        Val::Int(i) => {
            let mut buf = itoa::Buffer::new();
            Some(Rc::from(buf.format(*i)))
        }
        Val::Number(n) => Some(Rc::from(format_float(*n))),
        _ => None,
    }
}
