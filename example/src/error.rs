use myro::{Config, Connection, ErrorKind, Result, stream::Socket};

use crate::server;

pub async fn main() -> Result<()> {
    let config = Config::default();
    let io = server::spawn(vec![
        vec![server::error(1146, "Table 'demo.missing' doesn't exist")],
    ]);

    let mut conn = Connection::new(Socket::with_config(io, &config), &config);

    // rejected before anything is sent
    let err = conn.create_statement("  ").unwrap_err();
    assert!(err.is_invalid_argument());

    let err = conn
        .create_statement("SELECT * FROM missing")?
        .execute()
        .await
        .unwrap_err();

    match err.kind() {
        ErrorKind::Database(db) => tracing::info!(code = db.code(), "{db}"),
        kind => panic!("unexpected error: {kind}"),
    }

    Ok(())
}
