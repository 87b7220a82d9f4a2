//! The driver facade.

use mssql_codec::{TcpTransport, Transport};
use tds_protocol::rpc::{RpcMode, RpcParam};
use tds_protocol::token::{ColMetaData, ServerMessage};

use crate::command::{self, QueryResult};
use crate::config::Config;
use crate::context::TdsContext;
use crate::error::Error;
use crate::login;
use crate::row::Row;

/// A connected, authenticated SQL Server session.
///
/// All operations are blocking and strictly serialised: a call returns
/// only after the server has sent its final DONE for the request.
pub struct Client<T: Transport = TcpTransport> {
    ctx: TdsContext<T>,
    read_column_names: bool,
    info_cb: Option<Box<dyn FnMut(&ServerMessage)>>,
}

impl<T: Transport> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("read_column_names", &self.read_column_names)
            .finish_non_exhaustive()
    }
}

impl Client<TcpTransport> {
    /// Connect over TCP and log in.
    pub fn connect(config: &Config) -> Result<Self, Error> {
        Self::connect_with(TcpTransport::new(), config)
    }
}

impl<T: Transport> Client<T> {
    /// Connect over the given transport and log in.
    pub fn connect_with(transport: T, config: &Config) -> Result<Self, Error> {
        config.validate()?;

        let mut ctx = TdsContext::new(transport, config.buffer_capacity);
        ctx.connect(&config.host, config.port)
            .map_err(Error::ConnectionFailed)?;

        login::login(&mut ctx, config, None)?;

        Ok(Self {
            ctx,
            read_column_names: false,
            info_cb: None,
        })
    }

    /// Whether the session is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.ctx.is_authenticated()
    }

    /// The currently negotiated packet size.
    #[must_use]
    pub fn packet_size(&self) -> u16 {
        self.ctx.packet_size()
    }

    /// Install a callback for INFO and ERROR messages.
    ///
    /// Every server message is delivered regardless of severity; use
    /// [`ServerMessage::is_info`] to separate diagnostics from errors.
    pub fn set_info_callback(&mut self, cb: impl FnMut(&ServerMessage) + 'static) {
        self.info_cb = Some(Box::new(cb));
    }

    /// Control whether result-set column names are materialised.
    ///
    /// Off by default; when off, [`ColMetaData`] columns carry no name.
    pub fn option_set_read_column_names(&mut self, value: bool) {
        self.read_column_names = value;
    }

    /// Execute a SQL batch, discarding any result set rows.
    pub fn execute_query(&mut self, sql: &str) -> Result<QueryResult, Error> {
        self.query_with(sql, |_, _| {})
    }

    /// Execute a SQL batch, feeding each result-set row to `row_cb`.
    ///
    /// Rows arrive in wire order: every row after its result set's
    /// COLMETADATA, the completion result only after all rows.
    pub fn query_with(
        &mut self,
        sql: &str,
        mut row_cb: impl FnMut(&ColMetaData, &Row),
    ) -> Result<QueryResult, Error> {
        if !self.ctx.is_authenticated() {
            return Err(Error::NotAuthenticated);
        }
        command::execute_query(
            &mut self.ctx,
            sql,
            self.read_column_names,
            Some(&mut row_cb),
            self.info_cb
                .as_mut()
                .map(|cb| cb.as_mut() as &mut dyn FnMut(&ServerMessage)),
        )
    }

    /// Execute a parameterised statement via `sp_executesql`, discarding
    /// any result set rows.
    pub fn execute_rpc(
        &mut self,
        sql: &str,
        params: &[RpcParam],
        mode: RpcMode,
    ) -> Result<QueryResult, Error> {
        self.rpc_with(sql, params, mode, |_, _| {})
    }

    /// Execute a parameterised statement via `sp_executesql`, feeding
    /// each result-set row to `row_cb`.
    pub fn rpc_with(
        &mut self,
        sql: &str,
        params: &[RpcParam],
        mode: RpcMode,
        mut row_cb: impl FnMut(&ColMetaData, &Row),
    ) -> Result<QueryResult, Error> {
        if !self.ctx.is_authenticated() {
            return Err(Error::NotAuthenticated);
        }
        command::execute_rpc(
            &mut self.ctx,
            sql,
            params,
            mode,
            self.read_column_names,
            Some(&mut row_cb),
            self.info_cb
                .as_mut()
                .map(|cb| cb.as_mut() as &mut dyn FnMut(&ServerMessage)),
        )
    }

    /// Close the connection.
    pub fn disconnect(&mut self) {
        self.ctx.disconnect();
    }

    /// Access the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        self.ctx.transport_mut()
    }
}

impl<T: Transport> Drop for Client<T> {
    fn drop(&mut self) {
        self.ctx.disconnect();
    }
}
