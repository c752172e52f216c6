//! Base for data-access models

use std::sync::Arc;

use sqlx::mysql::{MySql, MySqlArguments, MySqlRow};
use sqlx::query::{Query, QueryAs};
use sqlx::FromRow;

use super::DatabaseService;
use crate::domain::DomainError;

/// Positional value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for SqlParam {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for SqlParam {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for SqlParam {
    fn from(value: u32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for SqlParam {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Outcome of an `INSERT`/`UPDATE`/`DELETE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteResult {
    pub rows_affected: u64,
    pub last_insert_id: u64,
}

/// Shared plumbing for models: prepared statements over the lazy pool.
///
/// Concrete models wrap a `BaseModel` and expose domain queries:
///
/// ```ignore
/// pub struct PlayerModel(BaseModel);
///
/// impl PlayerModel {
///     pub async fn find(&self, id: i64) -> Result<Option<Player>, DomainError> {
///         self.0.fetch_optional("SELECT * FROM players WHERE id = ?", &[id.into()]).await
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BaseModel {
    db: Arc<DatabaseService>,
}

impl BaseModel {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseService {
        &self.db
    }

    pub async fn fetch_all<T>(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<T>, DomainError>
    where
        T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
    {
        check_placeholders(sql, params)?;
        let pool = self.db.pool().await?;
        let rows = bind_query_as(sqlx::query_as::<_, T>(sql), params)
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }

    /// Exactly one row; no row is [`DomainError::NotFound`]
    pub async fn fetch_one<T>(&self, sql: &str, params: &[SqlParam]) -> Result<T, DomainError>
    where
        T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
    {
        check_placeholders(sql, params)?;
        let pool = self.db.pool().await?;
        let row = bind_query_as(sqlx::query_as::<_, T>(sql), params)
            .fetch_one(pool)
            .await?;
        Ok(row)
    }

    pub async fn fetch_optional<T>(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Option<T>, DomainError>
    where
        T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
    {
        check_placeholders(sql, params)?;
        let pool = self.db.pool().await?;
        let row = bind_query_as(sqlx::query_as::<_, T>(sql), params)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }

    pub async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<ExecuteResult, DomainError> {
        check_placeholders(sql, params)?;
        let pool = self.db.pool().await?;
        let result = bind_query(sqlx::query(sql), params).execute(pool).await?;

        Ok(ExecuteResult {
            rows_affected: result.rows_affected(),
            last_insert_id: result.last_insert_id(),
        })
    }
}

fn bind_query<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &[SqlParam],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param.clone() {
            SqlParam::Null => query.bind(None::<String>),
            SqlParam::Bool(v) => query.bind(v),
            SqlParam::Int(v) => query.bind(v),
            SqlParam::Float(v) => query.bind(v),
            SqlParam::Text(v) => query.bind(v),
        };
    }
    query
}

fn bind_query_as<'q, T>(
    mut query: QueryAs<'q, MySql, T, MySqlArguments>,
    params: &[SqlParam],
) -> QueryAs<'q, MySql, T, MySqlArguments> {
    for param in params {
        query = match param.clone() {
            SqlParam::Null => query.bind(None::<String>),
            SqlParam::Bool(v) => query.bind(v),
            SqlParam::Int(v) => query.bind(v),
            SqlParam::Float(v) => query.bind(v),
            SqlParam::Text(v) => query.bind(v),
        };
    }
    query
}

/// Count `?` placeholders outside quoted literals and comments.
///
/// Follows MySQL lexing: `\` escapes inside string literals, `#` and
/// `-- ` line comments, `/* */` block comments.
fn placeholder_count(sql: &str) -> usize {
    let mut count = 0;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                while let Some(inner) = chars.next() {
                    if inner == '\\' && c != '`' {
                        chars.next();
                    } else if inner == c {
                        // doubled quote stays inside the literal
                        if chars.peek() == Some(&c) {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                chars.next();
                if chars.peek().is_none_or(|next| next.is_whitespace()) {
                    skip_line(&mut chars);
                }
            }
            '#' => skip_line(&mut chars),
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for ch in chars.by_ref() {
                    if prev == '*' && ch == '/' {
                        break;
                    }
                    prev = ch;
                }
            }
            '?' => count += 1,
            _ => {}
        }
    }

    count
}

fn skip_line(chars: &mut impl Iterator<Item = char>) {
    for ch in chars {
        if ch == '\n' {
            break;
        }
    }
}

fn check_placeholders(sql: &str, params: &[SqlParam]) -> Result<(), DomainError> {
    let expected = placeholder_count(sql);
    if expected != params.len() {
        return Err(DomainError::validation(format!(
            "Query expects {} parameter(s) but {} were supplied",
            expected,
            params.len()
        )));
    }
    Ok(())
}
