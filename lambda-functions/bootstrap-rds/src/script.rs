use async_trait::async_trait;
use tracing::info;

use crate::secrets::Credential;

pub const BOOTSTRAP_SQL: &str = include_str!("../sql/bootstrap.sql");
pub const DATA_SQL: &str = include_str!("../sql/data.sql");
pub const BOOTSTRAP_POOL_SQL: &str = include_str!("../sql/bootstrap_pool.sql");
pub const USER_SQL: &str = include_str!("../sql/user.sql");

/// Statements executed between commits.
pub const MAX_SQL_BATCH_SIZE: usize = 25;

const STATEMENT_TERMINATOR: &str = ";";
const DOLLAR_QUOTED_TERMINATOR: &str = "$$;";

/// Pieces of `script` separated by `terminator` at the end of a line
/// (`\n` or `\r\n`). The flag tells whether the piece was terminated.
fn split_terminated<'a>(script: &'a str, terminator: &str) -> Vec<(&'a str, bool)> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut search = 0;

    while let Some(found) = script[search..].find(terminator) {
        let at = search + found;
        let after = at + terminator.len();
        let rest = &script[after..];

        let newline = if rest.starts_with("\r\n") {
            2
        } else if rest.starts_with('\n') {
            1
        } else {
            0
        };
        search = after + newline;

        if newline > 0 {
            pieces.push((&script[start..at], true));
            start = search;
        }
    }

    pieces.push((&script[start..], false));
    pieces
}

/// Plain statements, one per `;` line ending. The `;` is dropped.
pub fn split_statements(script: &str) -> Vec<String> {
    split_terminated(script, STATEMENT_TERMINATOR)
        .into_iter()
        .map(|(piece, _)| piece.trim())
        .filter(|piece| !piece.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Pieces ending in `$$;`, so `DO $$ ... $$;` blocks survive intact. The
/// application user placeholders are filled in from `app_user`.
pub fn split_dollar_quoted(script: &str, app_user: &Credential) -> Vec<String> {
    split_terminated(script, DOLLAR_QUOTED_TERMINATOR)
        .into_iter()
        .filter_map(|(piece, terminated)| {
            let body = piece
                .replace("{{DB_APP_USER}}", &app_user.username)
                .replace("{{DB_APP_PASS}}", &app_user.password);
            let body = body.trim();

            match (body.is_empty(), terminated) {
                (true, _) => None,
                (false, true) => Some(format!("{}{}", body, DOLLAR_QUOTED_TERMINATOR)),
                (false, false) => Some(body.to_string()),
            }
        })
        .collect()
}

/// A SQL connection with autocommit off.
#[async_trait]
pub trait StatementSink: Send {
    async fn execute(&mut self, sql: &str) -> anyhow::Result<()>;

    async fn commit(&mut self) -> anyhow::Result<()>;
}

/// Runs scripts over one connection, committing every [`MAX_SQL_BATCH_SIZE`]
/// statements. The count carries over from one script to the next.
pub struct ScriptRunner {
    sink: Box<dyn StatementSink>,
    executed: usize,
}

impl ScriptRunner {
    pub fn new(sink: Box<dyn StatementSink>) -> Self {
        Self { sink, executed: 0 }
    }

    pub fn executed(&self) -> usize {
        self.executed
    }

    pub async fn run_batched(&mut self, name: &str, statements: Vec<String>) -> anyhow::Result<()> {
        info!("Running {} ({} statements)", name, statements.len());

        for statement in statements {
            self.sink.execute(&statement).await?;
            self.executed += 1;
            if self.executed % MAX_SQL_BATCH_SIZE == 0 {
                self.sink.commit().await?;
            }
        }
        self.sink.commit().await
    }

    /// Runs every statement in a single transaction.
    pub async fn run_atomic(&mut self, name: &str, statements: Vec<String>) -> anyhow::Result<()> {
        info!("Running {} ({} statements)", name, statements.len());

        for statement in statements {
            self.sink.execute(&statement).await?;
            self.executed += 1;
        }
        self.sink.commit().await
    }
}
