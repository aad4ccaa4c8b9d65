use uow_repository::{Entity, Value};

/// Sample User entity with a database-generated key
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub age: i64,
}

impl User {
    pub fn new(username: &str, email: &str, age: i64) -> Self {
        Self {
            id: 0,
            username: username.to_string(),
            email: email.to_string(),
            age,
        }
    }
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["username", "email", "age"];

    fn key(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.username.clone().into(),
            self.email.clone().into(),
            self.age.into(),
        ]
    }
}

/// Sample Order entity whose key is chosen by the caller
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub product_name: String,
    pub amount: i64,
}

impl Order {
    pub fn new(id: i64, user_id: i64, product_name: &str, amount: i64) -> Self {
        Self {
            id,
            user_id,
            product_name: product_name.to_string(),
            amount,
        }
    }
}

impl Entity for Order {
    const TABLE: &'static str = "orders";
    const KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["user_id", "product_name", "amount"];
    const KEY_GENERATED: bool = false;

    fn key(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.user_id.into(),
            self.product_name.clone().into(),
            self.amount.into(),
        ]
    }
}
