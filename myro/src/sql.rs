//! Sql string operation.
use std::ops::Range;

use crate::{
    codec::{Parameter, ParameterWriter},
    common::{InvalidArgument, invalid},
};

/// Parsed sql string with its placeholder positions.
///
/// A placeholder is either `?` or a named `?name`, where name is an identifier. Every
/// placeholder takes one parameter index in order of appearance, the same name may appear
/// more than once. Placeholders inside string literals, quoted identifiers and comments
/// are ignored.
///
/// ```
/// use myro::sql::Query;
///
/// let query = Query::parse("SELECT '?', `?` FROM t WHERE id = ? -- ?");
/// assert_eq!(query.parameter_count(), 1);
///
/// let query = Query::parse("SELECT * FROM t WHERE a = ?id OR b = ?id AND c = ?");
/// assert_eq!(query.parameter_count(), 3);
/// assert_eq!(query.indices("id"), Some(&[0, 1][..]));
/// assert_eq!(query.native_sql(), "SELECT * FROM t WHERE a = ? OR b = ? AND c = ?");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    sql: String,
    /// Sql with names stripped, only when any placeholder is named.
    native: Option<String>,
    placeholders: Vec<Range<usize>>,
    names: Vec<(String, Vec<usize>)>,
}

impl Query {
    pub fn parse(sql: impl Into<String>) -> Query {
        let sql = sql.into();
        let placeholders = placeholders(sql.as_bytes());

        let mut names: Vec<(String, Vec<usize>)> = vec![];
        for (index, span) in placeholders.iter().enumerate() {
            if span.len() == 1 {
                continue;
            }
            let name = &sql[span.start + 1..span.end];
            match names.iter_mut().find(|(n, _)| n == name) {
                Some((_, indices)) => indices.push(index),
                None => names.push((name.to_owned(), vec![index])),
            }
        }

        let native = match names.is_empty() {
            true => None,
            false => {
                let mut native = String::with_capacity(sql.len());
                let mut offset = 0;
                for span in &placeholders {
                    native.push_str(&sql[offset..span.start]);
                    native.push('?');
                    offset = span.end;
                }
                native.push_str(&sql[offset..]);
                Some(native)
            }
        };

        Self { sql, native, placeholders, names }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Sql understood by the server, named placeholders are replaced with `?`.
    pub fn native_sql(&self) -> &str {
        self.native.as_deref().unwrap_or(&self.sql)
    }

    /// Parameter indices of a named placeholder.
    pub fn indices(&self, name: &str) -> Option<&[usize]> {
        self.names
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, indices)| indices.as_slice())
    }

    pub fn has_named_parameters(&self) -> bool {
        !self.names.is_empty()
    }

    pub fn has_parameters(&self) -> bool {
        !self.placeholders.is_empty()
    }

    pub fn parameter_count(&self) -> usize {
        self.placeholders.len()
    }

    /// Byte range of each placeholder, including the name.
    pub fn placeholders(&self) -> &[Range<usize>] {
        &self.placeholders
    }

    /// Replace each placeholder with SQL literal of the parameter.
    pub fn interpolate(&self, params: &[Parameter]) -> Result<String, InvalidArgument> {
        if params.len() != self.placeholders.len() {
            return Err(invalid!(
                "query requires {} parameters, found {}",
                self.placeholders.len(),
                params.len(),
            ));
        }

        let mut writer = ParameterWriter::with_capacity(self.sql.len() + params.len() * 8);
        let mut offset = 0;

        for (span, param) in self.placeholders.iter().zip(params) {
            writer.write_raw(&self.sql[offset..span.start]);
            param.write_text(&mut writer);
            offset = span.end;
        }

        writer.write_raw(&self.sql[offset..]);
        Ok(writer.into_string())
    }
}

#[derive(Clone, Copy)]
enum State {
    Normal,
    Quoted(u8),
    LineComment,
    BlockComment,
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn placeholders(sql: &[u8]) -> Vec<Range<usize>> {
    let mut placeholders = vec![];
    let mut state = State::Normal;
    let mut i = 0;

    while let Some(&b) = sql.get(i) {
        let next = sql.get(i + 1).copied();
        match state {
            State::Normal => match (b, next) {
                (b'?', Some(n)) if is_name_start(n) => {
                    let len = sql[i + 1..]
                        .iter()
                        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
                        .count();
                    placeholders.push(i..i + 1 + len);
                    i += len;
                }
                (b'?', _) => placeholders.push(i..i + 1),
                (b'\'' | b'"' | b'`', _) => state = State::Quoted(b),
                (b'#', _) => state = State::LineComment,
                (b'-', Some(b'-')) if sql.get(i + 2).is_none_or(u8::is_ascii_whitespace) => {
                    state = State::LineComment;
                    i += 1;
                }
                (b'/', Some(b'*')) => {
                    state = State::BlockComment;
                    i += 1;
                }
                _ => {}
            },
            State::Quoted(quote) => match (b, next) {
                // backslash escape, not in identifier
                (b'\\', Some(_)) if quote != b'`' => i += 1,
                // doubled quote
                (b, Some(n)) if b == quote && n == quote => i += 1,
                (b, _) if b == quote => state = State::Normal,
                _ => {}
            },
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if (b, next) == (b'*', Some(b'/')) {
                    state = State::Normal;
                    i += 1;
                }
            }
        }
        i += 1;
    }

    placeholders
}
