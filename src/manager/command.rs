use std::borrow::Cow;

use chrono::NaiveDateTime;
use tiberius::Query;

use crate::mapping::{BoundParam, matching_command};
use crate::types::SqlValue;

/// Execution mode of a command: literal SQL text or a stored-procedure
/// invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommandKind {
    Text,
    Procedure,
}

/// Turn a command plus a parameter record's bindings into the SQL the
/// driver executes and the positional parameters to bind, in order.
///
/// Text commands keep only the parameters the command text references
/// (substring containment) and have their named `@tokens` rewritten to the
/// driver's positional `@PN` placeholders. Procedure calls bind every
/// field and are invoked via an `EXEC` statement with explicit named
/// assignments.
pub(crate) fn prepare_command(
    kind: CommandKind,
    cmd: &str,
    params: Vec<BoundParam>,
) -> (String, Vec<BoundParam>) {
    match kind {
        CommandKind::Text => {
            let bound = matching_command(cmd, params);
            let sql = rewrite_named_placeholders(cmd, &bound).into_owned();
            (sql, bound)
        }
        CommandKind::Procedure => {
            let sql = procedure_call_sql(cmd, &params);
            (sql, params)
        }
    }
}

/// Rewrite named `@token` placeholders to positional `@PN`, where N is the
/// parameter's 1-based position in `params`.
///
/// Rewriting is identifier-exact (unlike the inclusion filter, which is
/// substring containment): a token only rewrites when the full identifier
/// equals a parameter name, case-sensitively. Tokens matching no parameter
/// are left verbatim for the server to reject, and `@@` system variables
/// are never touched. Quoted strings, bracketed identifiers, and comments
/// are skipped via a lightweight state machine.
pub(crate) fn rewrite_named_placeholders<'a>(
    sql: &'a str,
    params: &[BoundParam],
) -> Cow<'a, str> {
    if params.is_empty() {
        return Cow::Borrowed(sql);
    }

    let bytes = sql.as_bytes();
    let mut out = String::new();
    let mut copied = 0;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'[' => state = State::BracketQuoted,
                b'-' if bytes.get(idx + 1) == Some(&b'-') => {
                    state = State::LineComment;
                    idx += 1;
                }
                b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'@' if bytes.get(idx + 1) == Some(&b'@') => {
                    // system variable like @@ROWCOUNT
                    idx += 1 + scan_identifier(bytes, idx + 2).saturating_sub(idx + 2);
                }
                b'@' => {
                    let start = idx + 1;
                    let end = scan_identifier(bytes, start);
                    if end > start {
                        let name = &sql[start..end];
                        if let Some(position) = params.iter().position(|p| p.name == name) {
                            out.push_str(&sql[copied..idx]);
                            out.push_str("@P");
                            out.push_str(&(position + 1).to_string());
                            copied = end;
                        }
                        idx = end;
                        continue;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::BracketQuoted => {
                if b == b']' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if b == b'/' && bytes.get(idx + 1) == Some(&b'*') {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
        }
        idx += 1;
    }

    if copied == 0 {
        Cow::Borrowed(sql)
    } else {
        out.push_str(&sql[copied..]);
        Cow::Owned(out)
    }
}

enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    BracketQuoted,
    LineComment,
    BlockComment(u32),
}

// T-SQL identifier characters as they appear in variable names.
fn scan_identifier(bytes: &[u8], start: usize) -> usize {
    let mut idx = start;
    while idx < bytes.len()
        && (bytes[idx].is_ascii_alphanumeric() || matches!(bytes[idx], b'_' | b'#' | b'$'))
    {
        idx += 1;
    }
    idx
}

/// Build the `EXEC` statement invoking a stored procedure with every
/// parameter passed by name: `EXEC proc @Name = @P1, @Other = @P2`.
pub(crate) fn procedure_call_sql(procedure: &str, params: &[BoundParam]) -> String {
    if params.is_empty() {
        return format!("EXEC {procedure}");
    }
    let assignments = params
        .iter()
        .enumerate()
        .map(|(i, param)| format!("@{} = @P{}", param.name, i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    format!("EXEC {procedure} {assignments}")
}

/// Bind positional parameters onto a query builder, in order.
pub(crate) fn bind_params(query: &mut Query<'_>, params: &[BoundParam]) {
    for param in params {
        match &param.value {
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Timestamp(dt) => query.bind(*dt),
            SqlValue::Null => query.bind(Option::<String>::None),
            SqlValue::Json(json) => query.bind(json.to_string()),
            SqlValue::Blob(bytes) => query.bind(bytes.clone()),
        }
    }
}

/// Extract one column value from a driver row into the unified value type.
///
/// The driver row API is typed, so extraction probes the plausible types
/// in turn; anything unrecognized (or NULL) comes back as `Null`.
pub(crate) fn read_value(row: &tiberius::Row, idx: usize) -> SqlValue {
    if let Ok(Some(val)) = row.try_get::<u8, _>(idx) {
        return SqlValue::Int(i64::from(val));
    }
    if let Ok(Some(val)) = row.try_get::<i16, _>(idx) {
        return SqlValue::Int(i64::from(val));
    }
    if let Ok(Some(val)) = row.try_get::<i32, _>(idx) {
        return SqlValue::Int(i64::from(val));
    }
    if let Ok(Some(val)) = row.try_get::<i64, _>(idx) {
        return SqlValue::Int(val);
    }
    if let Ok(Some(val)) = row.try_get::<f32, _>(idx) {
        return SqlValue::Float(f64::from(val));
    }
    if let Ok(Some(val)) = row.try_get::<f64, _>(idx) {
        return SqlValue::Float(val);
    }
    if let Ok(Some(val)) = row.try_get::<bool, _>(idx) {
        return SqlValue::Bool(val);
    }
    if let Ok(Some(val)) = row.try_get::<NaiveDateTime, _>(idx) {
        return SqlValue::Timestamp(val);
    }
    if let Ok(Some(val)) = row.try_get::<&str, _>(idx) {
        return SqlValue::Text(val.to_string());
    }
    if let Ok(Some(val)) = row.try_get::<&[u8], _>(idx) {
        return SqlValue::Blob(val.to_vec());
    }
    SqlValue::Null
}
