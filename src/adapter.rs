//! Dialect-specific SQL text builders.

use sqlx::any::AnyArguments;

use crate::entity::{TableMeta, Value};
use crate::{RepositoryError, RepositoryResult};

/// SQL dialect of the connected database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
}

impl Dialect {
    /// Infers the dialect from a connection url scheme.
    pub fn from_url(url: &str) -> RepositoryResult<Self> {
        let scheme = url.split(':').next().unwrap_or_default();
        match scheme.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" => Ok(Dialect::Sqlite),
            _ => Err(RepositoryError::UnsupportedDialect(scheme.to_string())),
        }
    }

    /// Placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
        }
    }

    /// Whether `INSERT .. RETURNING` is used to read generated keys. MySQL
    /// reports them through the query result instead.
    pub fn returns_generated_key(self) -> bool {
        matches!(self, Dialect::Postgres | Dialect::Sqlite)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// Parameters of a paged list query. Pages are 1-based.
///
/// ```ignore
/// let request = PageRequest::new(2, 10)
///     .filter("age > ?", vec![18.into()])
///     .order_by("age")
///     .ascending();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub filter: Option<String>,
    pub params: Vec<Value>,
    pub order_by: Option<String>,
    pub direction: SortDirection,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            filter: None,
            params: Vec::new(),
            order_by: None,
            direction: SortDirection::default(),
        }
    }

    pub fn filter(mut self, filter: impl Into<String>, params: Vec<Value>) -> Self {
        self.filter = Some(filter.into());
        self.params = params;
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self
    }

    pub fn ascending(mut self) -> Self {
        self.direction = SortDirection::Ascending;
        self
    }

    pub fn descending(mut self) -> Self {
        self.direction = SortDirection::Descending;
        self
    }

    fn offset(&self) -> RepositoryResult<i64> {
        if self.page == 0 {
            return Err(RepositoryError::InvalidPage("page numbers start at 1".to_string()));
        }
        if self.size == 0 {
            return Err(RepositoryError::InvalidPage("page size must be positive".to_string()));
        }
        i64::from(self.page - 1)
            .checked_mul(i64::from(self.size))
            .ok_or_else(|| RepositoryError::InvalidPage("offset overflows".to_string()))
    }
}

/// SQL text together with its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlBuilder {
    pub sql: String,
    pub arguments: Vec<Value>,
}

impl SqlBuilder {
    fn new(sql: String, arguments: Vec<Value>) -> Self {
        Self { sql, arguments }
    }

    pub(crate) fn bind<'q>(&self) -> Result<AnyArguments<'q>, sqlx::Error> {
        bind_all(&self.arguments)
    }
}

pub(crate) fn bind_all<'q>(values: &[Value]) -> Result<AnyArguments<'q>, sqlx::Error> {
    let mut args = AnyArguments::default();
    for value in values {
        value.add_to(&mut args)?;
    }
    Ok(args)
}

/// Builds statements for one dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlAdapter {
    dialect: Dialect,
}

impl SqlAdapter {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn select_all(&self, meta: &TableMeta) -> SqlBuilder {
        SqlBuilder::new(
            format!("SELECT {} FROM {}", meta.select_list(), meta.table),
            Vec::new(),
        )
    }

    pub fn select_by_key(&self, meta: &TableMeta, id: i64) -> SqlBuilder {
        SqlBuilder::new(
            format!(
                "SELECT {} FROM {} WHERE {} = {}",
                meta.select_list(),
                meta.table,
                meta.key,
                self.dialect.placeholder(1)
            ),
            vec![Value::Int(id)],
        )
    }

    /// Unordered list; an empty filter selects every row.
    pub fn filtered_list(&self, meta: &TableMeta, filter: Option<&str>, params: Vec<Value>) -> SqlBuilder {
        let mut sql = format!("SELECT {} FROM {}", meta.select_list(), meta.table);
        let params = if push_filter(&mut sql, filter) { params } else { Vec::new() };
        SqlBuilder::new(sql, params)
    }

    /// Ordered `LIMIT`/`OFFSET` page. The limit and offset are bound after the
    /// caller's filter parameters.
    pub fn page_list(&self, meta: &TableMeta, request: &PageRequest) -> RepositoryResult<SqlBuilder> {
        let offset = request.offset()?;
        let order_by = match request.order_by.as_deref() {
            Some(column) => validate_identifier(column)?,
            None => meta.key,
        };

        let mut sql = format!("SELECT {} FROM {}", meta.select_list(), meta.table);
        let mut params = if push_filter(&mut sql, request.filter.as_deref()) {
            request.params.clone()
        } else {
            Vec::new()
        };

        let limit_index = params.len() + 1;
        sql.push_str(&format!(
            " ORDER BY {} {} LIMIT {} OFFSET {}",
            order_by,
            request.direction.as_sql(),
            self.dialect.placeholder(limit_index),
            self.dialect.placeholder(limit_index + 1)
        ));
        params.push(Value::Int(i64::from(request.size)));
        params.push(Value::Int(offset));

        Ok(SqlBuilder::new(sql, params))
    }

    pub fn count(&self, meta: &TableMeta, filter: Option<&str>, params: Vec<Value>) -> SqlBuilder {
        let mut sql = format!("SELECT COUNT(*) FROM {}", meta.table);
        let params = if push_filter(&mut sql, filter) { params } else { Vec::new() };
        SqlBuilder::new(sql, params)
    }

    /// Insert of one row. When the key is caller-supplied it is bound first.
    pub fn insert(&self, meta: &TableMeta, key: i64, values: Vec<Value>) -> SqlBuilder {
        let mut columns: Vec<&str> = Vec::with_capacity(meta.columns.len() + 1);
        let mut arguments = Vec::with_capacity(values.len() + 1);
        if !meta.key_generated {
            columns.push(meta.key);
            arguments.push(Value::Int(key));
        }
        columns.extend(meta.columns.iter().copied());
        arguments.extend(values);

        let placeholders = (1..=arguments.len())
            .map(|i| self.dialect.placeholder(i))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            meta.table,
            columns.join(", "),
            placeholders
        );
        if meta.key_generated && self.dialect.returns_generated_key() {
            sql.push_str(&format!(" RETURNING {}", meta.key));
        }
        SqlBuilder::new(sql, arguments)
    }

    pub fn update(&self, meta: &TableMeta, key: i64, values: Vec<Value>) -> SqlBuilder {
        let assignments = meta
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = {}", column, self.dialect.placeholder(i + 1)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = {}",
            meta.table,
            assignments,
            meta.key,
            self.dialect.placeholder(meta.columns.len() + 1)
        );
        let mut arguments = values;
        arguments.push(Value::Int(key));
        SqlBuilder::new(sql, arguments)
    }

    pub fn delete(&self, meta: &TableMeta, key: i64) -> SqlBuilder {
        SqlBuilder::new(
            format!(
                "DELETE FROM {} WHERE {} = {}",
                meta.table,
                meta.key,
                self.dialect.placeholder(1)
            ),
            vec![Value::Int(key)],
        )
    }
}

/// Appends ` WHERE <filter>` when the filter is not blank and reports whether
/// it did. A leading `WHERE` keyword in the filter is dropped.
fn push_filter(sql: &mut String, filter: Option<&str>) -> bool {
    match normalize_filter(filter) {
        Some(filter) => {
            sql.push_str(" WHERE ");
            sql.push_str(filter);
            true
        }
        None => false,
    }
}

fn normalize_filter(filter: Option<&str>) -> Option<&str> {
    let filter = filter?.trim();
    let filter = match (filter.get(..5), filter.get(5..)) {
        (Some(head), Some(rest))
            if head.eq_ignore_ascii_case("where") && rest.starts_with(|c: char| c.is_ascii_whitespace()) =>
        {
            rest.trim_start()
        }
        _ => filter,
    };
    (!filter.is_empty()).then_some(filter)
}

fn validate_identifier(name: &str) -> RepositoryResult<&str> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if valid {
        Ok(name)
    } else {
        Err(RepositoryError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USERS: TableMeta = TableMeta {
        table: "users",
        key: "id",
        columns: &["name", "age"],
        key_generated: true,
    };

    #[test]
    fn dialect_from_url() {
        assert_eq!(Dialect::from_url("postgres://localhost/db").unwrap(), Dialect::Postgres);
        assert_eq!(Dialect::from_url("postgresql://localhost/db").unwrap(), Dialect::Postgres);
        assert_eq!(Dialect::from_url("mysql://root@localhost/db").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::from_url("sqlite::memory:").unwrap(), Dialect::Sqlite);
        assert!(matches!(
            Dialect::from_url("mssql://localhost"),
            Err(RepositoryError::UnsupportedDialect(scheme)) if scheme == "mssql"
        ));
    }

    #[test]
    fn empty_filter_lists_every_row() {
        let adapter = SqlAdapter::new(Dialect::Sqlite);
        let stmt = adapter.filtered_list(&USERS, Some("   "), vec![1.into()]);
        assert_eq!(stmt.sql, "SELECT id, name, age FROM users");
        assert!(stmt.arguments.is_empty());
    }

    #[test]
    fn leading_where_keyword_is_dropped() {
        let adapter = SqlAdapter::new(Dialect::Sqlite);
        let stmt = adapter.filtered_list(&USERS, Some("WHERE name like ?"), vec!["%a%".into()]);
        assert_eq!(stmt.sql, "SELECT id, name, age FROM users WHERE name like ?");
        assert_eq!(stmt.arguments, vec![Value::Text("%a%".to_string())]);
    }

    #[test]
    fn where_keyword_followed_by_any_whitespace_is_dropped() {
        assert_eq!(normalize_filter(Some("WHERE\tage > ?")), Some("age > ?"));
        assert_eq!(normalize_filter(Some("where\n  age > ?")), Some("age > ?"));
        assert_eq!(normalize_filter(Some("  WHERE ")), Some("WHERE"));
        assert_eq!(normalize_filter(Some("whereabouts = ?")), Some("whereabouts = ?"));

        let adapter = SqlAdapter::new(Dialect::Sqlite);
        let stmt = adapter.count(&USERS, Some("WHERE\r\nage > ?"), vec![1.into()]);
        assert_eq!(stmt.sql, "SELECT COUNT(*) FROM users WHERE age > ?");
    }

    #[test]
    fn page_defaults_to_key_descending() {
        let adapter = SqlAdapter::new(Dialect::Sqlite);
        let stmt = adapter.page_list(&USERS, &PageRequest::new(1, 5)).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT id, name, age FROM users ORDER BY id DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(stmt.arguments, vec![Value::Int(5), Value::Int(0)]);
    }

    #[test]
    fn postgres_page_numbers_after_filter_params() {
        let adapter = SqlAdapter::new(Dialect::Postgres);
        let request = PageRequest::new(2, 10)
            .filter("age > $1", vec![18.into()])
            .order_by("age")
            .ascending();
        let stmt = adapter.page_list(&USERS, &request).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT id, name, age FROM users WHERE age > $1 ORDER BY age ASC LIMIT $2 OFFSET $3"
        );
        assert_eq!(stmt.arguments, vec![Value::Int(18), Value::Int(10), Value::Int(10)]);
    }

    #[test]
    fn page_zero_is_rejected() {
        let adapter = SqlAdapter::new(Dialect::MySql);
        assert!(matches!(
            adapter.page_list(&USERS, &PageRequest::new(0, 10)),
            Err(RepositoryError::InvalidPage(_))
        ));
        assert!(matches!(
            adapter.page_list(&USERS, &PageRequest::new(1, 0)),
            Err(RepositoryError::InvalidPage(_))
        ));
    }

    #[test]
    fn order_column_must_be_identifier() {
        let adapter = SqlAdapter::new(Dialect::Sqlite);
        let request = PageRequest::new(1, 10).order_by("age; DROP TABLE users");
        assert!(matches!(
            adapter.page_list(&USERS, &request),
            Err(RepositoryError::InvalidIdentifier(_))
        ));

        let request = PageRequest::new(1, 10).order_by("users.age");
        assert!(adapter.page_list(&USERS, &request).is_ok());
    }

    #[test]
    fn insert_returns_generated_key_except_on_mysql() {
        let values: Vec<Value> = vec!["ann".into(), 30.into()];
        let pg = SqlAdapter::new(Dialect::Postgres).insert(&USERS, 0, values.clone());
        assert_eq!(pg.sql, "INSERT INTO users (name, age) VALUES ($1, $2) RETURNING id");

        let sqlite = SqlAdapter::new(Dialect::Sqlite).insert(&USERS, 0, values.clone());
        assert_eq!(sqlite.sql, "INSERT INTO users (name, age) VALUES (?, ?) RETURNING id");
        assert_eq!(sqlite.arguments.len(), 2);

        let mysql = SqlAdapter::new(Dialect::MySql).insert(&USERS, 0, values);
        assert_eq!(mysql.sql, "INSERT INTO users (name, age) VALUES (?, ?)");
    }

    #[test]
    fn insert_binds_caller_key_first() {
        let meta = TableMeta {
            key_generated: false,
            ..USERS
        };
        let stmt = SqlAdapter::new(Dialect::Postgres).insert(&meta, 7, vec!["ann".into(), 30.into()]);
        assert_eq!(stmt.sql, "INSERT INTO users (id, name, age) VALUES ($1, $2, $3)");
        assert_eq!(stmt.arguments[0], Value::Int(7));
    }

    #[test]
    fn update_binds_key_last() {
        let stmt = SqlAdapter::new(Dialect::Postgres).update(&USERS, 3, vec!["bob".into(), 41.into()]);
        assert_eq!(stmt.sql, "UPDATE users SET name = $1, age = $2 WHERE id = $3");
        assert_eq!(stmt.arguments.last(), Some(&Value::Int(3)));
    }

    #[test]
    fn delete_and_count() {
        let adapter = SqlAdapter::new(Dialect::Sqlite);
        assert_eq!(adapter.delete(&USERS, 1).sql, "DELETE FROM users WHERE id = ?");
        assert_eq!(
            adapter.count(&USERS, Some("age > ?"), vec![1.into()]).sql,
            "SELECT COUNT(*) FROM users WHERE age > ?"
        );
    }
}
