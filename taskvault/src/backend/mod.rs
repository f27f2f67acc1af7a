//! Backend capability layer.
//!
//! This module defines the `AuthApi` and `TableApi` traits that abstract the
//! hosted backend (Supabase over HTTP, or an in-process stand-in) behind the
//! minimal request/response surface the client needs.

mod memory;
mod supabase;

pub use memory::MemoryBackend;
pub use supabase::SupabaseBackend;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use taskvault_common::{Identity, Session};

use crate::error::Result;

/// Email/password pair sent to the auth service.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Result of an account creation request.
///
/// `session` is `None` when the account must be confirmed before use.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub user: Identity,
    pub session: Option<Session>,
}

/// Equality filter on a single column (`column=eq.value`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }

    /// Whether a JSON row satisfies this filter.
    pub fn matches(&self, row: &Value) -> bool {
        match row.get(&self.column) {
            Some(Value::String(s)) => *s == self.value,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == self.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A read against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Select {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }
}

/// Authentication capability of the backend.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Request account creation.
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUp>;

    /// Exchange an email/password pair for a session.
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session>;

    /// Exchange a refresh token for a fresh session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session>;

    /// Look up the identity behind an access token.
    async fn get_user(&self, access_token: &str) -> Result<Identity>;

    /// Invalidate the session behind an access token.
    async fn sign_out(&self, access_token: &str) -> Result<()>;
}

/// Table capability of the backend, generic over table name.
///
/// Every call runs as the identity behind `access_token`; row-level access
/// rules decide which rows it can see or change.
#[async_trait]
pub trait TableApi: Send + Sync {
    async fn select(&self, access_token: &str, query: &Select) -> Result<Vec<Value>>;

    async fn insert(&self, access_token: &str, table: &str, row: Value) -> Result<()>;

    async fn update(
        &self,
        access_token: &str,
        table: &str,
        patch: Value,
        filters: &[Filter],
    ) -> Result<()>;

    async fn delete(&self, access_token: &str, table: &str, filters: &[Filter]) -> Result<()>;
}

/// Both capabilities behind one object.
pub trait Backend: AuthApi + TableApi {}

impl<T: AuthApi + TableApi> Backend for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_select_builder() {
        let query = Select::from("tasks")
            .eq("user_id", "abc")
            .order("created_at", false);
        assert_eq!(query.table, "tasks");
        assert_eq!(query.columns, "*");
        assert_eq!(query.filters, vec![Filter::eq("user_id", "abc")]);
        assert_eq!(
            query.order,
            Some(Order {
                column: "created_at".to_string(),
                ascending: false
            })
        );
    }

    #[test]
    fn test_filter_matches_strings_and_scalars() {
        let row = json!({"id": "t1", "is_done": true, "n": 3, "gone": null});
        assert!(Filter::eq("id", "t1").matches(&row));
        assert!(!Filter::eq("id", "t2").matches(&row));
        assert!(Filter::eq("is_done", true).matches(&row));
        assert!(Filter::eq("n", 3).matches(&row));
        assert!(!Filter::eq("gone", "null").matches(&row));
        assert!(!Filter::eq("missing", "x").matches(&row));
    }
}
