//! The [`Statement`] type.
use bytes::Bytes;
use std::sync::Arc;

use crate::{
    Encode, QueryResult, Result, Row,
    codec::Parameter,
    common::{invalid, verbose},
    connection::Connection,
    protocol::{ColumnFlags, ColumnMetadata, ColumnType},
    sql::Query,
    transport::Transport,
};

/// Server side prepared statement handle.
#[derive(Clone, Debug)]
pub struct PreparedStatement {
    id: u32,
    params: u16,
    columns: Arc<[ColumnMetadata]>,
}

impl PreparedStatement {
    pub fn new(id: u32, params: u16, columns: Arc<[ColumnMetadata]>) -> PreparedStatement {
        Self { id, params, columns }
    }

    /// Statement id assigned by the server.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Number of parameters the server expects.
    pub fn params(&self) -> usize {
        self.params.into()
    }

    /// Result set columns, as reported when the statement is prepared.
    pub fn columns(&self) -> &Arc<[ColumnMetadata]> {
        &self.columns
    }
}

/// Execution strategy of a statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatementKind {
    /// Text protocol, no parameters.
    TextSimple,
    /// Text protocol, parameters are interpolated as sql literal.
    TextParametrized,
    /// Binary protocol, no parameters.
    PrepareSimple,
    /// Binary protocol, parameters are sent separately.
    PrepareParametrized,
}

impl StatementKind {
    pub(crate) fn select(prepare: bool, has_parameters: bool) -> StatementKind {
        match (prepare, has_parameters) {
            (false, false) => Self::TextSimple,
            (false, true) => Self::TextParametrized,
            (true, false) => Self::PrepareSimple,
            (true, true) => Self::PrepareParametrized,
        }
    }

    pub fn is_prepared(&self) -> bool {
        matches!(self, Self::PrepareSimple | Self::PrepareParametrized)
    }

    pub fn is_parametrized(&self) -> bool {
        matches!(self, Self::TextParametrized | Self::PrepareParametrized)
    }
}

/// A statement created by [`Connection::create_statement`].
///
/// # Example
///
/// ```no_run
/// # async fn app(mut conn: myro::Connection<impl myro::transport::Transport>) -> myro::Result<()> {
/// let mut stmt = conn.create_statement("INSERT INTO post(id, name) VALUES (?, ?)")?;
///
/// stmt.bind(0, 1)?.bind(1, "foo")?.add()?;
/// stmt.bind(0, 2)?.bind(1, "bar")?;
///
/// let results = stmt.execute().await?;
/// assert_eq!(results.len(), 2);
/// # Ok(())
/// # }
/// ```
#[must_use = "statement does nothing unless executed"]
pub struct Statement<'c, T: Transport> {
    conn: &'c mut Connection<T>,
    kind: StatementKind,
    query: Arc<Query>,
    bindings: Vec<Option<Parameter>>,
    batches: Vec<Vec<Parameter>>,
    generated: Option<String>,
}

/// Column name of generated value when none is given.
const LAST_INSERT_ID: &str = "LAST_INSERT_ID";

impl<'c, T: Transport> Statement<'c, T> {
    pub(crate) fn new(conn: &'c mut Connection<T>, kind: StatementKind, query: Arc<Query>) -> Self {
        let bindings = vec![None; query.parameter_count()];
        Self { conn, kind, query, bindings, batches: vec![], generated: None }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn sql(&self) -> &str {
        self.query.sql()
    }

    /// Bind a value to the parameter at `index`, starting from 0.
    pub fn bind(&mut self, index: usize, value: impl Encode) -> Result<&mut Self> {
        self.check_index(index)?;
        let param = self.conn.codecs().encode(value.encode())?;
        self.bindings[index] = Some(param);
        Ok(self)
    }

    /// Bind `NULL` to the parameter at `index`, starting from 0.
    pub fn bind_null(&mut self, index: usize) -> Result<&mut Self> {
        self.check_index(index)?;
        self.bindings[index] = Some(Parameter::null());
        Ok(self)
    }

    /// Bind a value to every `?name` placeholder with the given name.
    pub fn bind_named(&mut self, name: &str, value: impl Encode) -> Result<&mut Self> {
        let param = self.conn.codecs().encode(value.encode())?;
        self.bind_all(name, param)
    }

    /// Bind `NULL` to every `?name` placeholder with the given name.
    pub fn bind_null_named(&mut self, name: &str) -> Result<&mut Self> {
        self.bind_all(name, Parameter::null())
    }

    /// Expose last insert id of each `OK` result as a row with one column.
    ///
    /// Column is named `LAST_INSERT_ID` when `columns` is empty. At most one column
    /// is allowed since only one generated value is reported by the server.
    pub fn returns_generated_values(&mut self, columns: &[&str]) -> Result<&mut Self> {
        let name = match columns {
            [] => LAST_INSERT_ID,
            [name] if !name.is_empty() => *name,
            [_] => return Err(invalid!(%"generated column name must not be empty").into()),
            _ => return Err(invalid!(
                "only one generated column is supported, found {}", columns.len()
            ).into()),
        };
        self.generated = Some(name.to_owned());
        Ok(self)
    }

    /// Save current bindings as one batch and start a new one.
    pub fn add(&mut self) -> Result<&mut Self> {
        let params = self.take_bindings()?;
        self.batches.push(params);
        Ok(self)
    }

    /// Number of rows to fetch at a time.
    ///
    /// Rows are always read fully, the hint is accepted for compatibility.
    pub fn fetch_size(&mut self, rows: u32) -> &mut Self {
        verbose!(rows, "fetch size hint ignored");
        let _ = rows;
        self
    }

    /// Execute statement, returns one result for each result set or `OK` packet.
    ///
    /// Every batch is executed in order, binding errors are returned before any io.
    pub async fn execute(mut self) -> Result<Vec<QueryResult>> {
        verbose!(kind = ?self.kind, sql = self.query.sql(), "execute");

        let pending = self.bindings.iter().any(Option::is_some);
        if pending || self.batches.is_empty() {
            let params = self.take_bindings()?;
            self.batches.push(params);
        }

        let Self { conn, kind, query, batches, generated, .. } = self;

        let mut results = match kind {
            StatementKind::TextSimple => conn.execute_text(query.sql()).await?,
            StatementKind::TextParametrized => {
                let sqls = batches
                    .iter()
                    .map(|params| query.interpolate(params))
                    .collect::<Result<Vec<_>, _>>()?;

                let mut results = vec![];
                for sql in sqls {
                    results.extend(conn.execute_text(&sql).await?);
                }
                results
            }
            StatementKind::PrepareSimple | StatementKind::PrepareParametrized => {
                conn.execute_prepared(query.native_sql(), &batches).await?
            }
        };

        if let Some(name) = generated {
            let mut column = ColumnMetadata::new(name, ColumnType::LongLong);
            column.charset = 63;
            column.flags = ColumnFlags::new(ColumnFlags::NOT_NULL | ColumnFlags::UNSIGNED);
            let columns: Arc<[ColumnMetadata]> = Arc::new([column]);

            for result in results.iter_mut().filter(|e| !e.is_result_set()) {
                let value = itoa::Buffer::new().format(result.last_insert_id).to_owned();
                let row = Row::new(
                    columns.clone(),
                    vec![Some(Bytes::from(value))],
                    false,
                    conn.codecs().clone(),
                );
                result.columns = columns.clone();
                result.rows = vec![row];
            }
        }

        Ok(results)
    }

    fn bind_all(&mut self, name: &str, param: Parameter) -> Result<&mut Self> {
        let Some(indices) = self.query.indices(name) else {
            return Err(invalid!("statement does not have parameter named `{name}`").into());
        };
        for &index in indices {
            self.bindings[index] = Some(param.clone());
        }
        Ok(self)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if !self.kind.is_parametrized() {
            return Err(invalid!(
                "statement `{}` does not have parameters", self.query.sql()
            ).into());
        }
        if index >= self.bindings.len() {
            return Err(invalid!(
                "parameter index {index} out of range, statement has {} parameters",
                self.bindings.len(),
            ).into());
        }
        Ok(())
    }

    fn take_bindings(&mut self) -> Result<Vec<Parameter>> {
        if let Some(missing) = self.bindings.iter().position(Option::is_none) {
            return Err(invalid!("parameter {missing} is not bound").into());
        }
        let params = self.bindings.iter_mut().filter_map(Option::take).collect();
        Ok(params)
    }
}

impl<T: Transport> std::fmt::Debug for Statement<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("kind", &self.kind)
            .field("sql", &self.query.sql())
            .field("batches", &self.batches.len())
            .field("generated", &self.generated)
            .finish()
    }
}
