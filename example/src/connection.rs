use myro::{Config, Connection, Result, ValidationDepth, stream::Socket};

use crate::server;

pub async fn main() -> Result<()> {
    // will read `MYSQL_*` or `DATABASE_URL` environment variable
    let config = Config::from_env();

    let mut script = vec![];
    if config.isolation_level().is_some() {
        script.push(vec![server::ok()]);
    }
    // ping, quit
    script.push(vec![server::ok()]);
    script.push(vec![]);

    let io = server::spawn(script);
    let mut conn = Connection::setup(Socket::with_config(io, &config), &config).await?;

    assert!(conn.validate(ValidationDepth::Remote).await);
    conn.close().await?;
    assert!(!conn.validate(ValidationDepth::Local).await);

    Ok(())
}
