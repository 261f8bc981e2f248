//! Transaction and savepoint commands.
use std::fmt;

use crate::{
    Connection, Result,
    common::{InvalidArgument, invalid, verbose},
    transport::Transport,
};

/// Transaction isolation level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    /// InnoDB default.
    #[default]
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// Sql keyword of the level.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }

    /// Parse level name, separated by space, `-`, or `_`, case insensitive.
    ///
    /// ```
    /// use myro::IsolationLevel;
    ///
    /// assert_eq!(IsolationLevel::parse("read-committed"), Some(IsolationLevel::ReadCommitted));
    /// assert_eq!(IsolationLevel::parse("SERIALIZABLE"), Some(IsolationLevel::Serializable));
    /// ```
    pub fn parse(name: &str) -> Option<IsolationLevel> {
        let name = name.trim().to_ascii_uppercase().replace(['-', '_'], " ");
        [
            Self::ReadUncommitted,
            Self::ReadCommitted,
            Self::RepeatableRead,
            Self::Serializable,
        ]
        .into_iter()
        .find(|level| level.as_sql() == name)
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Quote savepoint name as identifier, embedded backtick is doubled.
fn savepoint_name(name: &str) -> Result<String, InvalidArgument> {
    if name.is_empty() {
        return Err(invalid!(%"savepoint name must not be empty"));
    }

    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('`');
    for ch in name.chars() {
        if ch == '`' {
            quoted.push('`');
        }
        quoted.push(ch);
    }
    quoted.push('`');
    Ok(quoted)
}

impl<T: Transport> Connection<T> {
    /// Start a transaction with `BEGIN`.
    pub async fn begin_transaction(&mut self) -> Result<()> {
        self.command("BEGIN").await?;
        Ok(())
    }

    pub async fn commit_transaction(&mut self) -> Result<()> {
        self.command("COMMIT").await?;
        Ok(())
    }

    pub async fn rollback_transaction(&mut self) -> Result<()> {
        self.command("ROLLBACK").await?;
        Ok(())
    }

    /// Returns error if `name` is empty, before any command is sent.
    pub async fn create_savepoint(&mut self, name: &str) -> Result<()> {
        let name = savepoint_name(name)?;
        self.command(&format!("SAVEPOINT {name}")).await?;
        Ok(())
    }

    /// Returns error if `name` is empty, before any command is sent.
    pub async fn release_savepoint(&mut self, name: &str) -> Result<()> {
        let name = savepoint_name(name)?;
        self.command(&format!("RELEASE SAVEPOINT {name}")).await?;
        Ok(())
    }

    /// Returns error if `name` is empty, before any command is sent.
    pub async fn rollback_transaction_to_savepoint(&mut self, name: &str) -> Result<()> {
        let name = savepoint_name(name)?;
        self.command(&format!("ROLLBACK TO SAVEPOINT {name}")).await?;
        Ok(())
    }

    /// Set isolation level of the session.
    ///
    /// [`transaction_isolation_level`][1] is only updated when the server accepts the command.
    ///
    /// [1]: Connection::transaction_isolation_level
    pub async fn set_transaction_isolation_level(&mut self, level: IsolationLevel) -> Result<()> {
        let sql = format!("SET SESSION TRANSACTION ISOLATION LEVEL {level}");
        self.command(&sql).await?;
        verbose!(%level, "isolation level");
        self.isolation_level = level;
        Ok(())
    }

    /// Isolation level of the session, as last set successfully.
    pub fn transaction_isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    pub async fn set_auto_commit(&mut self, auto_commit: bool) -> Result<()> {
        let sql = match auto_commit {
            true => "SET autocommit=1",
            false => "SET autocommit=0",
        };
        self.command(sql).await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn quote_savepoint() {
        assert_eq!(savepoint_name("sp1").unwrap(), "`sp1`");
        assert_eq!(savepoint_name("a`b").unwrap(), "`a``b`");
        assert!(savepoint_name("").is_err());
    }

    #[test]
    fn parse_isolation_level() {
        assert_eq!(IsolationLevel::parse("repeatable_read"), Some(IsolationLevel::RepeatableRead));
        assert_eq!(IsolationLevel::parse("READ UNCOMMITTED"), Some(IsolationLevel::ReadUncommitted));
        assert_eq!(IsolationLevel::parse("snapshot"), None);
        assert_eq!(IsolationLevel::Serializable.to_string(), "SERIALIZABLE");
    }
}
