//! The command state machine.
//!
//! One instance exists per `execute_query` / `execute_rpc` call. It
//! claims COLMETADATA and ROW through the subtoken hook (everything else
//! still flows through the generic token dispatch), feeds each decoded
//! row to the caller's row callback, and collects the completion result
//! from the last DONE token.

use mssql_codec::Transport;
use tds_protocol::ProtocolError;
use tds_protocol::packet::PacketType;
use tds_protocol::rpc::{RpcMode, RpcParam, RpcRequest};
use tds_protocol::sql_batch::encode_sql_batch;
use tds_protocol::token::{ColMetaData, Done, DoneStatus, ServerMessage, TokenType, decode_row};

use crate::context::{SubtokenOutcome, TdsContext, TokenSink};
use crate::error::Error;
use crate::row::Row;

/// Completion result of a query or RPC.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryResult {
    /// Row count from the last DONE token.
    pub affected_rows: u32,
    /// Status of the last DONE token.
    pub status: DoneStatus,
}

impl QueryResult {
    /// Whether the statement completed without a server-side error.
    ///
    /// The affected-row count is populated either way.
    #[must_use]
    pub fn ok(&self) -> bool {
        !(self.status.error || self.status.srverror)
    }
}

/// Per-row callback: column metadata plus the materialised row.
pub(crate) type RowCallback<'a> = dyn FnMut(&ColMetaData, &Row) + 'a;

/// INFO/ERROR callback.
pub(crate) type InfoCallback<'a> = dyn FnMut(&ServerMessage) + 'a;

struct CommandSink<'r, 'row, 'info> {
    read_column_names: bool,
    colmeta: Option<ColMetaData>,
    result: QueryResult,
    row_cb: Option<&'r mut RowCallback<'row>>,
    info_cb: Option<&'r mut InfoCallback<'info>>,
}

impl TokenSink for CommandSink<'_, '_, '_> {
    fn on_message(&mut self, message: &ServerMessage) {
        if let Some(cb) = self.info_cb.as_mut() {
            cb(message);
        }
    }

    fn on_done(&mut self, done: &Done) {
        // every DONE overwrites: the last one in the stream wins
        self.result.status = done.status;
        self.result.affected_rows = done.done_row_count;
        tracing::trace!(
            kind = ?done.kind,
            rows = done.done_row_count,
            more = done.status.more,
            "statement completion"
        );
    }

    fn on_subtoken(&mut self, token: u8, src: &mut &[u8]) -> SubtokenOutcome {
        match TokenType::from_u8(token) {
            Some(TokenType::ColMetaData) => {
                match ColMetaData::decode(src, self.read_column_names) {
                    Ok(meta) => {
                        tracing::trace!(columns = meta.len(), "result set metadata");
                        self.colmeta = Some(meta);
                        SubtokenOutcome::Consumed
                    }
                    Err(err) => shortage_or_fatal(err),
                }
            }
            Some(TokenType::Row) => {
                let Some(meta) = self.colmeta.as_ref() else {
                    return SubtokenOutcome::Fatal(ProtocolError::MissingPriorColMetaData);
                };
                match decode_row(src, meta) {
                    Ok(fields) => {
                        let row = Row::new(fields);
                        if let Some(cb) = self.row_cb.as_mut() {
                            cb(meta, &row);
                        }
                        SubtokenOutcome::Consumed
                    }
                    Err(err) => shortage_or_fatal(err),
                }
            }
            _ => SubtokenOutcome::Unhandled,
        }
    }
}

fn shortage_or_fatal(err: ProtocolError) -> SubtokenOutcome {
    match err.deficit() {
        Some(needed) => SubtokenOutcome::NeedMore(needed),
        None => SubtokenOutcome::Fatal(err),
    }
}

/// Execute a SQL batch.
pub(crate) fn execute_query<T: Transport>(
    ctx: &mut TdsContext<T>,
    sql: &str,
    read_column_names: bool,
    row_cb: Option<&mut RowCallback<'_>>,
    info_cb: Option<&mut InfoCallback<'_>>,
) -> Result<QueryResult, Error> {
    ctx.stage(&encode_sql_batch(sql))?;
    ctx.send_message(PacketType::SqlBatch)?;
    run(ctx, read_column_names, row_cb, info_cb)
}

/// Execute a parameterised statement through `sp_executesql`.
pub(crate) fn execute_rpc<T: Transport>(
    ctx: &mut TdsContext<T>,
    sql: &str,
    params: &[RpcParam],
    mode: RpcMode,
    read_column_names: bool,
    row_cb: Option<&mut RowCallback<'_>>,
    info_cb: Option<&mut InfoCallback<'_>>,
) -> Result<QueryResult, Error> {
    // prepexec is advertised but reserved
    if mode != RpcMode::ExecuteSql {
        return Err(Error::RpcInvalidMode(mode));
    }

    ctx.stage(&RpcRequest::execute_sql(sql, params).encode())?;
    ctx.send_message(PacketType::Rpc)?;
    run(ctx, read_column_names, row_cb, info_cb)
}

fn run<'row, 'info, T: Transport>(
    ctx: &mut TdsContext<T>,
    read_column_names: bool,
    row_cb: Option<&mut RowCallback<'row>>,
    info_cb: Option<&mut InfoCallback<'info>>,
) -> Result<QueryResult, Error> {
    let mut sink = CommandSink {
        read_column_names,
        colmeta: None,
        result: QueryResult::default(),
        row_cb,
        info_cb,
    };
    ctx.receive(&mut sink)?;
    Ok(sink.result)
}
