//! The login state machine.
//!
//! Builds the LOGIN7 request from the configuration, sends it as a
//! single PDU of type LOGIN and receives the server's response message.
//! Success requires a LOGINACK; a DONE carrying the server-error bit, or
//! a response without any LOGINACK, is a failed login.

use mssql_codec::Transport;
use tds_protocol::login7::Login7;
use tds_protocol::packet::PacketType;
use tds_protocol::token::{Done, LoginAck, ServerMessage};

use crate::config::Config;
use crate::context::{TdsContext, TokenSink};
use crate::error::Error;

#[derive(Default)]
struct LoginSink<'r, 'info> {
    ack_received: bool,
    srverror: bool,
    info_cb: Option<&'r mut (dyn FnMut(&ServerMessage) + 'info)>,
}

impl TokenSink for LoginSink<'_, '_> {
    fn on_message(&mut self, message: &ServerMessage) {
        if let Some(cb) = self.info_cb.as_mut() {
            cb(message);
        }
    }

    fn on_login_ack(&mut self, _ack: &LoginAck) {
        self.ack_received = true;
    }

    fn on_done(&mut self, done: &Done) {
        self.srverror |= done.status.srverror;
    }
}

/// Drive the connect→login→authenticated transition.
pub(crate) fn login<T: Transport>(
    ctx: &mut TdsContext<T>,
    config: &Config,
    info_cb: Option<&mut (dyn FnMut(&ServerMessage) + '_)>,
) -> Result<(), Error> {
    let login7 = Login7::new()
        .with_server_name(config.host.as_str())
        .with_sql_auth(config.username.as_str(), config.password.as_str())
        .with_database(config.database.as_str())
        .with_app_name(config.app_name.as_str())
        .with_client_name(config.client_name.as_str())
        .with_packet_size(config.packet_size);

    ctx.stage(&login7.encode())?;
    ctx.send_message(PacketType::Tds7Login)?;

    let mut sink = LoginSink {
        ack_received: false,
        srverror: false,
        info_cb,
    };
    ctx.receive(&mut sink)?;

    if sink.srverror || !sink.ack_received || !ctx.is_authenticated() {
        tracing::warn!(
            ack = sink.ack_received,
            srverror = sink.srverror,
            "login rejected by server"
        );
        ctx.disconnect();
        return Err(Error::LoginFailed);
    }

    tracing::debug!(packet_size = ctx.packet_size(), "login complete");
    Ok(())
}
