use bytes::Bytes;
use myro::{Config, Connection, IsolationLevel, Result, stream::Socket};

use crate::server;

pub async fn main() -> Result<()> {
    let config = Config::default();

    // isolation, begin, savepoint, insert, rollback to, commit
    let io = server::spawn(vec![
        vec![server::ok()],
        vec![Bytes::from_static(b"\x00\x00\x00\x03\x00\x00\x00")],
        vec![server::ok()],
        vec![server::affected(1, 3)],
        vec![server::ok()],
        vec![server::ok()],
    ]);

    let mut conn = Connection::new(Socket::with_config(io, &config), &config);

    conn.set_transaction_isolation_level(IsolationLevel::Serializable).await?;
    conn.begin_transaction().await?;
    assert!(conn.in_transaction());

    conn.create_savepoint("before_insert").await?;

    let mut stmt = conn.create_statement("INSERT INTO post(name) VALUES (?)")?;
    stmt.bind(0, "draft")?;
    stmt.execute().await?;

    conn.rollback_transaction_to_savepoint("before_insert").await?;
    conn.commit_transaction().await?;

    assert_eq!(conn.transaction_isolation_level(), IsolationLevel::Serializable);

    Ok(())
}

