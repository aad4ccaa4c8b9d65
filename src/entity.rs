use sqlx::any::{AnyArguments, AnyRow};
use sqlx::{Arguments, FromRow};

/// A row-mapped record type with an explicitly declared table mapping.
///
/// The mapping is static: the table name, primary key and column list are
/// associated constants, and `values` must yield one [`Value`] per entry of
/// `COLUMNS`, in the same order.
///
/// # Example
///
/// ```ignore
/// #[derive(sqlx::FromRow)]
/// struct User { id: i64, name: String, email: String }
///
/// impl Entity for User {
///     const TABLE: &'static str = "users";
///     const KEY: &'static str = "id";
///     const COLUMNS: &'static [&'static str] = &["name", "email"];
///
///     fn key(&self) -> i64 { self.id }
///     fn values(&self) -> Vec<Value> {
///         vec![self.name.clone().into(), self.email.clone().into()]
///     }
/// }
/// ```
pub trait Entity: for<'r> FromRow<'r, AnyRow> + Send + Sync + Unpin + 'static {
    /// Table the entity is stored in.
    const TABLE: &'static str;

    /// Primary key column.
    const KEY: &'static str;

    /// Non-key columns, in the order `values` produces them.
    const COLUMNS: &'static [&'static str];

    /// Whether the database assigns the key on insert.
    const KEY_GENERATED: bool = true;

    fn key(&self) -> i64;

    fn values(&self) -> Vec<Value>;
}

/// Table mapping of an [`Entity`] as plain data, consumed by the SQL adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableMeta {
    pub table: &'static str,
    pub key: &'static str,
    pub columns: &'static [&'static str],
    pub key_generated: bool,
}

impl TableMeta {
    pub fn of<T: Entity>() -> Self {
        Self {
            table: T::TABLE,
            key: T::KEY,
            columns: T::COLUMNS,
            key_generated: T::KEY_GENERATED,
        }
    }

    /// Key column followed by every mapped column.
    pub(crate) fn select_list(&self) -> String {
        std::iter::once(self.key)
            .chain(self.columns.iter().copied())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Column type of a bind parameter, kept for nulls so that strictly typed
/// backends (Postgres) accept them for non-text columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    Bytes,
}

/// A bind parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null(ValueKind),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub(crate) fn add_to(&self, args: &mut AnyArguments<'_>) -> Result<(), sqlx::Error> {
        let added = match self {
            Value::Null(ValueKind::Bool) => args.add(None::<bool>),
            Value::Null(ValueKind::Int) => args.add(None::<i64>),
            Value::Null(ValueKind::Float) => args.add(None::<f64>),
            Value::Null(ValueKind::Text) => args.add(None::<String>),
            Value::Null(ValueKind::Bytes) => args.add(None::<Vec<u8>>),
            Value::Bool(v) => args.add(*v),
            Value::Int(v) => args.add(*v),
            Value::Float(v) => args.add(*v),
            Value::Text(v) => args.add(v.clone()),
            Value::Bytes(v) => args.add(v.clone()),
        };
        added.map_err(sqlx::Error::Encode)
    }
}

/// Rust types with a fixed [`ValueKind`], so `None::<T>` binds a typed null.
pub trait ValueType: Into<Value> {
    const KIND: ValueKind;
}

macro_rules! impl_value {
    ($($ty:ty => $kind:ident, |$v:ident| $conv:expr;)*) => {$(
        impl From<$ty> for Value {
            fn from($v: $ty) -> Self {
                $conv
            }
        }

        impl ValueType for $ty {
            const KIND: ValueKind = ValueKind::$kind;
        }
    )*};
}

impl_value! {
    bool => Bool, |v| Value::Bool(v);
    i32 => Int, |v| Value::Int(v.into());
    u32 => Int, |v| Value::Int(v.into());
    i64 => Int, |v| Value::Int(v);
    f64 => Float, |v| Value::Float(v);
    String => Text, |v| Value::Text(v);
    &str => Text, |v| Value::Text(v.to_owned());
    Vec<u8> => Bytes, |v| Value::Bytes(v);
}

impl<T: ValueType> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null(T::KIND), Into::into)
    }
}
