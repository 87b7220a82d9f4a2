//! # mssql-client
//!
//! A blocking SQL Server client speaking TDS 7.1/7.2 over a pluggable
//! byte transport.
//!
//! The driver is single-threaded and strictly request/response: one
//! shared message buffer carries both directions, `execute_query` and
//! `execute_rpc` return only after the server's final DONE, and result
//! rows are streamed to a callback in wire order.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mssql_client::{Client, Config};
//!
//! let config = Config::new("db.example.com")
//!     .with_credentials("sa", "hunter2")
//!     .with_database("master");
//!
//! let mut client = Client::connect(&config)?;
//! client.option_set_read_column_names(true);
//!
//! let result = client.query_with("SELECT id, name FROM users", |meta, row| {
//!     for field in row.fields(meta) {
//!         print!("{}\t", field.display());
//!     }
//!     println!();
//! })?;
//! println!("{} row(s)", result.affected_rows);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod client;
mod command;
mod config;
mod context;
mod error;
mod login;
mod row;

pub use client::Client;
pub use command::QueryResult;
pub use config::Config;
pub use error::Error;
pub use row::{Field, Row};

pub use mssql_codec::{TcpTransport, Transport};
pub use mssql_types::{SqlValue, TypeError};
pub use tds_protocol::rpc::{RpcMode, RpcParam};
pub use tds_protocol::token::{ColMetaData, Column, DoneStatus, ServerMessage};
pub use tds_protocol::types::TypeId;
