use stackbind_core::{Context, Error, Result, Table, wrap};

/// Registers the `string` table.
pub fn open_string(ctx: &Context<'_>) -> Result<()> {
    let string = Table::with_capacity(ctx, 0, 6);
    string.at("len").set(wrap(|s: String| s.len() as i64))?;
    string.at("upper").set(wrap(|s: String| s.to_ascii_uppercase()))?;
    string.at("lower").set(wrap(|s: String| s.to_ascii_lowercase()))?;
    string.at("rep").set(wrap(rep))?;
    string.at("sub").set(wrap(sub))?;
    string.at("reverse").set(wrap(|s: String| s.chars().rev().collect::<String>()))?;
    ctx.global("string").set(&string)
}

/// Upper bound on what `rep` may build.
const MAX_REP_BYTES: usize = 1 << 28;

fn rep(s: String, n: i64, sep: Option<String>) -> Result<String> {
    if n <= 0 {
        return Ok(String::new());
    }
    let sep = sep.unwrap_or_default();
    let n = n as usize;
    let total = (s.len() + sep.len())
        .checked_mul(n)
        .filter(|&total| total <= MAX_REP_BYTES)
        .ok_or_else(|| Error::runtime("resulting string too large"))?;
    let mut out = String::with_capacity(total);
    for i in 0..n {
        if i > 0 {
            out.push_str(&sep);
        }
        out.push_str(&s);
    }
    Ok(out)
}

/// Byte range `i..=j` with negative positions counted from the end.
fn sub(s: String, i: i64, j: Option<i64>) -> String {
    let len = s.len() as i64;
    let start = match i {
        i if i < 0 => (len + i + 1).max(1),
        0 => 1,
        i => i,
    };
    let end = match j.unwrap_or(-1) {
        j if j < 0 => len + j + 1,
        j => j.min(len),
    };
    if start > end {
        return String::new();
    }
    String::from_utf8_lossy(&s.as_bytes()[(start - 1) as usize..end as usize]).into_owned()
}
