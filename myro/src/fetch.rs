//! Command round trips.
//!
//! Every function sends one command, flushes it, and reads the complete response, so the
//! transport is always left at a command boundary.
use std::sync::Arc;

use crate::{
    QueryResult, Result, Row,
    codec::{Codecs, Parameter},
    common::{invalid, verbose},
    protocol::{
        BackendProtocol, ColumnMetadata, OkPacket, ProtocolError, ServerStatus,
        backend::{
            self, ColumnCount, EofPacket, LOCAL_INFILE_HEADER, OK_HEADER, PrepareOk,
        },
        frontend,
    },
    statement::PreparedStatement,
    transport::{Transport, TransportExt},
};

/// Row format of a result set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Format {
    Text,
    Binary,
}

/// Response of a command, every result set in order.
#[derive(Debug)]
pub(crate) struct Response {
    pub results: Vec<QueryResult>,
    /// Status of the last `OK` or `EOF` packet.
    pub status: ServerStatus,
}

/// Send `COM_QUERY` and read every result.
pub(crate) async fn query<T: Transport>(io: &mut T, codecs: &Arc<Codecs>, sql: &str) -> Result<Response> {
    io.send(frontend::Query { sql });
    io.flush().await?;
    results(io, codecs, Format::Text).await
}

/// Send `COM_QUERY` which response is a single `OK` packet.
pub(crate) async fn command<T: Transport>(io: &mut T, sql: &str) -> Result<OkPacket> {
    io.send(frontend::Query { sql });
    io.flush().await?;
    io.recv().await
}

/// Send `COM_PING`.
pub(crate) async fn ping<T: Transport>(io: &mut T) -> Result<OkPacket> {
    io.send(frontend::Ping);
    io.flush().await?;
    io.recv().await
}

/// Send `COM_QUIT`, server close the connection without response.
pub(crate) async fn quit<T: Transport>(io: &mut T) -> Result<()> {
    io.send(frontend::Quit);
    io.flush().await
}

/// Send `COM_STMT_PREPARE` and read the statement definition.
pub(crate) async fn prepare<T: Transport>(io: &mut T, sql: &str) -> Result<PreparedStatement> {
    io.send(frontend::StmtPrepare { sql });
    io.flush().await?;

    let ok = io.recv::<PrepareOk>().await?;
    let capabilities = io.capabilities();

    // parameter definitions carry no information usable by the client
    for _ in 0..ok.params {
        io.recv_packet().await?;
    }
    if ok.params > 0 && !capabilities.deprecate_eof() {
        io.recv::<EofPacket>().await?;
    }

    let mut columns = Vec::with_capacity(ok.columns.into());
    for _ in 0..ok.columns {
        columns.push(io.recv::<ColumnMetadata>().await?);
    }
    if ok.columns > 0 && !capabilities.deprecate_eof() {
        io.recv::<EofPacket>().await?;
    }

    verbose!(id = ok.statement_id, params = ok.params, columns = ok.columns, "prepared");

    Ok(PreparedStatement::new(ok.statement_id, ok.params, columns.into()))
}

/// Send `COM_STMT_EXECUTE` and read every result.
pub(crate) async fn execute<T: Transport>(
    io: &mut T,
    codecs: &Arc<Codecs>,
    stmt: &PreparedStatement,
    params: &[Parameter],
) -> Result<Response> {
    if params.len() != stmt.params() {
        return Err(invalid!(
            "prepared statement requires {} parameters, found {}",
            stmt.params(),
            params.len(),
        ).into());
    }

    io.send(frontend::StmtExecute { statement_id: stmt.id(), params });
    io.flush().await?;
    results(io, codecs, Format::Binary).await
}

/// Send `COM_STMT_CLOSE`, server does not respond.
pub(crate) async fn close<T: Transport>(io: &mut T, statement_id: u32) -> Result<()> {
    verbose!(id = statement_id, "close statement");
    io.send(frontend::StmtClose { statement_id });
    io.flush().await
}

/// Read results until server reports no more result exists.
async fn results<T: Transport>(io: &mut T, codecs: &Arc<Codecs>, format: Format) -> Result<Response> {
    let capabilities = io.capabilities();
    let mut results = vec![];

    loop {
        let packet = io.recv_packet().await?;

        let (result, status) = match packet.first() {
            Some(&OK_HEADER) => {
                let ok = OkPacket::decode(packet)?;
                let result = QueryResult {
                    columns: Arc::new([]),
                    rows: vec![],
                    affected_rows: ok.affected_rows,
                    last_insert_id: ok.last_insert_id,
                    warnings: ok.warnings,
                };
                (result, ok.status)
            }
            Some(&LOCAL_INFILE_HEADER) => {
                return Err(ProtocolError::unexpected(LOCAL_INFILE_HEADER, "LOCAL INFILE").into());
            }
            _ => {
                let ColumnCount(count) = ColumnCount::decode(packet)?;
                let Ok(count) = usize::try_from(count) else {
                    return Err(ProtocolError::malformed("ColumnCount").into());
                };

                let mut columns = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    columns.push(io.recv::<ColumnMetadata>().await?);
                }
                if !capabilities.deprecate_eof() {
                    io.recv::<EofPacket>().await?;
                }

                let columns: Arc<[ColumnMetadata]> = columns.into();
                let mut rows = vec![];

                let end = loop {
                    let packet = io.recv_packet().await?;
                    if backend::is_result_end(&packet, capabilities) {
                        break packet;
                    }
                    let values = match format {
                        Format::Text => backend::decode_text_row(packet, columns.len())?,
                        Format::Binary => backend::decode_binary_row(packet, &columns)?,
                    };
                    rows.push(Row::new(columns.clone(), values, format == Format::Binary, codecs.clone()));
                };

                let (warnings, status) = match capabilities.deprecate_eof() {
                    true => {
                        let ok = OkPacket::decode(end)?;
                        (ok.warnings, ok.status)
                    }
                    false => {
                        let eof = EofPacket::decode(end)?;
                        (eof.warnings, eof.status)
                    }
                };

                verbose!(rows = rows.len(), columns = columns.len(), "result set");

                let result = QueryResult { columns, rows, affected_rows: 0, last_insert_id: 0, warnings };
                (result, status)
            }
        };

        results.push(result);

        if !status.more_results() {
            return Ok(Response { results, status });
        }
    }
}
