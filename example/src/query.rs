use myro::{
    Config, Connection, FromRow, PreparePolicy, Result, Row, protocol::ColumnType, stream::Socket,
};

use crate::server;

#[derive(Debug)]
struct Post {
    #[allow(unused)]
    id: i32,
    name: String,
}

impl FromRow for Post {
    fn from_row(row: Row) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    }
}

pub async fn main() -> Result<()> {
    let policy = PreparePolicy::When(|sql| sql.starts_with("INSERT"));
    let config = Config::parse("mysql://root:@localhost/demo")?.prepare(policy);

    let io = server::spawn(vec![
        // prepared once, cached for the next statement
        vec![
            server::prepare_ok(1, 0, 1),
            server::column("?", ColumnType::VarString),
        ],
        vec![server::affected(1, 1)],
        vec![server::affected(1, 2)],
        // text protocol
        vec![
            server::column_count(2),
            server::column("id", ColumnType::Long),
            server::column("name", ColumnType::VarString),
            server::text_row(&[Some("1"), Some("thread0")]),
            server::text_row(&[Some("2"), Some("thread1")]),
            server::end(),
        ],
    ]);

    let mut conn = Connection::new(Socket::with_config(io, &config), &config);

    for id in 0..2 {
        let mut stmt = conn.create_statement("INSERT INTO post(name) VALUES (?)")?;
        stmt.bind(0, format!("thread{id}"))?;
        let result = stmt.execute().await?;
        tracing::info!(last_insert_id = result[0].last_insert_id, "inserted");
    }

    let mut results = conn
        .create_statement("SELECT id, name FROM post")?
        .execute()
        .await?;
    let posts = results.remove(0).decode::<Post>()?;

    assert!(posts.iter().any(|e| e.name.as_str() == "thread1"));
    assert_eq!(posts.len(), 2);

    Ok(())
}
