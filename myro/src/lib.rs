//! Mysql Protocol Layer
//!
//! Turns values and queries into mysql wire format, and wire format responses back into
//! typed values. Connection phase is done by the caller, the [`Connection`] drives an already
//! authenticated [`Transport`][transport::Transport].
//!
//! # Examples
//!
//! ```no_run
//! # #[cfg(feature = "tokio")]
//! # async fn app(io: tokio::io::DuplexStream) -> myro::Result<()> {
//! use myro::{Config, Connection, stream::Socket};
//!
//! let config = Config::from_env();
//! let mut conn = Connection::setup(Socket::with_config(io, &config), &config).await?;
//!
//! let mut stmt = conn.create_statement("SELECT 420, ?")?;
//! stmt.bind(0, "Foo")?;
//!
//! let mut results = stmt.execute().await?;
//! let rows = results.remove(0).decode::<(i32, String)>()?;
//!
//! assert_eq!(rows[0].0, 420);
//! assert_eq!(rows[0].1.as_str(), "Foo");
//! # Ok(())
//! # }
//! ```
//!
//! Statements and transactions:
//!
//! ```no_run
//! # async fn app(mut conn: myro::Connection<impl myro::transport::Transport>) -> myro::Result<()> {
//! use myro::IsolationLevel;
//!
//! conn.set_transaction_isolation_level(IsolationLevel::Serializable).await?;
//! conn.begin_transaction().await?;
//! conn.create_savepoint("before_insert").await?;
//!
//! let mut stmt = conn.create_statement("INSERT INTO post(name) VALUES (?)")?;
//! stmt.bind(0, "foo")?;
//! let result = stmt.execute().await?;
//!
//! if result[0].affected_rows == 0 {
//!     conn.rollback_transaction_to_savepoint("before_insert").await?;
//! }
//!
//! conn.commit_transaction().await?;
//! # Ok(())
//! # }
//! ```

pub mod common;
mod ext;
#[cfg(feature = "tokio")]
mod io;

// Protocol
pub mod protocol;

// Encoding
mod value;
pub mod codec;
pub mod sql;
pub mod row;

// Component
pub mod cache;
mod statement;
mod fetch;

// Operation
pub mod transport;
#[cfg(feature = "tokio")]
pub mod stream;
pub mod transaction;

// Connection
pub mod connection;

mod error;


pub use value::{Value, Encode};
pub use codec::{Codecs, Parameter};
pub use row::{Row, FromRow, Decode, DecodeError, QueryResult};

pub use statement::{Statement, StatementKind, PreparedStatement};
pub use transaction::IsolationLevel;
pub use connection::{Connection, Config, PreparePolicy, ValidationDepth};
pub use error::{Error, ErrorKind, Result};
