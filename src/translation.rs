//! Turns a SQL template plus arguments into final SQL and a flat parameter list.

use crate::error::SqlGatewayError;
use crate::query::{Arg, QueryAndParams, QueryArgs};
use crate::types::RowValues;

/// Converts a templated SQL string and its arguments into what a driver executes.
pub trait Preprocessor: Send {
    /// # Errors
    /// Returns `SqlGatewayError::ParameterError` if the template and arguments do not line up.
    fn process(&self, sql: &str, args: &QueryArgs) -> Result<QueryAndParams, SqlGatewayError>;
}

/// Default preprocessor: `?` takes the next positional argument, `:name` a named one.
///
/// Value arguments become `?` with one bound parameter. [`SqlLiteral`](crate::SqlLiteral)
/// arguments are spliced in verbatim and contribute their own parameters. Quoted strings,
/// `` `backticked` `` and `[bracketed]` identifiers and comments are copied untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderPreprocessor;

impl Preprocessor for PlaceholderPreprocessor {
    fn process(&self, sql: &str, args: &QueryArgs) -> Result<QueryAndParams, SqlGatewayError> {
        let bytes = sql.as_bytes();
        let mut out = String::with_capacity(sql.len());
        let mut params = Vec::new();
        let mut positional = args.positional().iter();
        let mut state = State::Normal;
        let mut copied_to = 0;
        let mut idx = 0;

        while idx < bytes.len() {
            let b = bytes[idx];
            match state {
                State::Normal => match b {
                    b'\'' | b'"' | b'`' => state = State::Quoted(b),
                    b'[' => state = State::Bracketed,
                    b'-' if bytes.get(idx + 1) == Some(&b'-') => {
                        state = State::LineComment;
                        idx += 1;
                    }
                    b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                        state = State::BlockComment(1);
                        idx += 1;
                    }
                    b':' if bytes.get(idx + 1) == Some(&b':') => {
                        // cast operator
                        idx += 1;
                    }
                    b'?' => {
                        out.push_str(&sql[copied_to..idx]);
                        let arg = positional.next().ok_or_else(|| {
                            SqlGatewayError::ParameterError(format!(
                                "placeholder at byte {idx} has no matching argument"
                            ))
                        })?;
                        splice(arg, &mut out, &mut params);
                        copied_to = idx + 1;
                    }
                    b':' => {
                        if let Some(end) = scan_identifier(bytes, idx + 1) {
                            let name = &sql[idx + 1..end];
                            out.push_str(&sql[copied_to..idx]);
                            let arg = args.get_named(name).ok_or_else(|| {
                                SqlGatewayError::ParameterError(format!(
                                    "named placeholder ':{name}' has no matching argument"
                                ))
                            })?;
                            splice(arg, &mut out, &mut params);
                            copied_to = end;
                            idx = end - 1;
                        }
                    }
                    _ => {}
                },
                State::Quoted(quote) => {
                    if b == quote {
                        if bytes.get(idx + 1) == Some(&quote) {
                            idx += 1; // skip escaped quote
                        } else {
                            state = State::Normal;
                        }
                    }
                }
                State::Bracketed => {
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
                        if depth == 1 {
                            state = State::Normal;
                        } else {
                            state = State::BlockComment(depth - 1);
                        }
                        idx += 1;
                    }
                }
            }
            idx += 1;
        }

        let unused = positional.count();
        if unused > 0 {
            return Err(SqlGatewayError::ParameterError(format!(
                "{unused} positional argument(s) left without a placeholder"
            )));
        }

        out.push_str(&sql[copied_to..]);
        Ok(QueryAndParams::new(out, params))
    }
}

#[derive(Clone, Copy)]
enum State {
    Normal,
    /// Inside `'...'`, `"..."` or `` `...` ``; a doubled delimiter is an escape.
    Quoted(u8),
    Bracketed,
    LineComment,
    BlockComment(u32),
}

fn splice(arg: &Arg, out: &mut String, params: &mut Vec<RowValues>) {
    match arg {
        Arg::Value(value) => {
            out.push('?');
            params.push(value.clone());
        }
        Arg::Literal(literal) => {
            out.push_str(literal.sql());
            params.extend_from_slice(literal.params());
        }
    }
}

fn scan_identifier(bytes: &[u8], start: usize) -> Option<usize> {
    let first = *bytes.get(start)?;
    if !(first.is_ascii_alphabetic() || first == b'_') {
        return None;
    }
    let mut idx = start + 1;
    while idx < bytes.len() && (bytes[idx].is_ascii_alphanumeric() || bytes[idx] == b'_') {
        idx += 1;
    }
    Some(idx)
}
