//! In-process backend with row-level access emulation.
//!
//! Stands in for the hosted project in tests and offline use. Callers only
//! see and change rows whose owner column equals their own identity, the
//! same guarantee the hosted access policies give.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{Map, Value};
use taskvault_common::{Identity, Session};
use uuid::Uuid;

use super::{AuthApi, Credentials, Filter, Order, Select, SignUp, TableApi};
use crate::error::{Error, Result};

const MIN_PASSWORD_LEN: usize = 6;

/// Row-level policy of one table: rows belong to the identity in `owner_column`.
struct TablePolicy {
    name: &'static str,
    owner_column: &'static str,
    defaults: &'static [(&'static str, fn() -> Value)],
}

fn default_false() -> Value {
    Value::Bool(false)
}

const POLICIES: &[TablePolicy] = &[
    TablePolicy {
        name: "profiles",
        owner_column: "id",
        defaults: &[],
    },
    TablePolicy {
        name: "tasks",
        owner_column: "user_id",
        defaults: &[("is_done", default_false)],
    },
];

fn policy(table: &str) -> Result<&'static TablePolicy> {
    POLICIES.iter().find(|p| p.name == table).ok_or_else(|| {
        Error::backend(format!(
            "Could not find the table 'public.{}' in the schema cache",
            table
        ))
    })
}

struct Account {
    identity: Identity,
    password: String,
    confirmed: bool,
}

struct IssuedToken {
    user_id: Uuid,
    expires_at: i64,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    access_tokens: HashMap<String, IssuedToken>,
    refresh_tokens: HashMap<String, Uuid>,
    tables: HashMap<String, Vec<Value>>,
    last_created_at: Option<DateTime<Utc>>,
}

impl State {
    fn caller(&self, access_token: &str) -> Result<Uuid> {
        let token = self
            .access_tokens
            .get(access_token)
            .ok_or_else(|| Error::backend("invalid JWT: unable to parse or verify signature"))?;
        if token.expires_at <= Utc::now().timestamp() {
            return Err(Error::backend("JWT expired"));
        }
        Ok(token.user_id)
    }

    fn identity(&self, user_id: Uuid) -> Option<Identity> {
        self.accounts
            .values()
            .find(|a| a.identity.id == user_id)
            .map(|a| a.identity.clone())
    }

    fn issue_session(&mut self, user: Identity, lifetime_secs: i64) -> Session {
        let access_token = format!("access-{}", Uuid::new_v4());
        let refresh_token = format!("refresh-{}", Uuid::new_v4());
        let expires_at = Utc::now().timestamp() + lifetime_secs;

        self.access_tokens.insert(
            access_token.clone(),
            IssuedToken {
                user_id: user.id,
                expires_at,
            },
        );
        self.refresh_tokens.insert(refresh_token.clone(), user.id);

        Session {
            access_token,
            refresh_token,
            expires_at,
            user,
        }
    }

    /// Server-assigned creation time, strictly increasing across inserts.
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_created_at {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_created_at = Some(next);
        next
    }

    fn rows_mut(&mut self, table: &str) -> &mut Vec<Value> {
        self.tables.entry(table.to_string()).or_default()
    }
}

/// In-memory implementation of [`AuthApi`] and [`TableApi`].
pub struct MemoryBackend {
    state: Mutex<State>,
    requests: AtomicUsize,
    auto_confirm: bool,
    token_lifetime_secs: i64,
}

impl MemoryBackend {
    /// Backend whose sign-ups are usable immediately.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            requests: AtomicUsize::new(0),
            auto_confirm: true,
            token_lifetime_secs: 3600,
        }
    }

    /// Require [`MemoryBackend::confirm_email`] before a new account can sign in.
    pub fn requiring_confirmation(mut self) -> Self {
        self.auto_confirm = false;
        self
    }

    pub fn with_token_lifetime(mut self, secs: i64) -> Self {
        self.token_lifetime_secs = secs;
        self
    }

    /// Number of auth and table calls served so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(AtomicOrdering::SeqCst)
    }

    /// Mark an account as confirmed, as following the emailed link would.
    pub fn confirm_email(&self, email: &str) -> Result<()> {
        let mut state = self.lock()?;
        let account = state
            .accounts
            .get_mut(email)
            .ok_or_else(|| Error::backend("User not found"))?;
        account.confirmed = true;
        Ok(())
    }

    /// All rows of a table, bypassing access rules.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock()
            .map(|state| state.tables.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Insert a row as the service role, bypassing access rules.
    pub fn seed_row(&self, table: &str, row: Value) -> Result<()> {
        let policy = policy(table)?;
        let mut state = self.lock()?;
        let row = with_defaults(&mut state, policy, row)?;
        state.rows_mut(table).push(row);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| Error::backend(format!("backend state poisoned: {}", e)))
    }

    fn begin(&self) -> Result<MutexGuard<'_, State>> {
        self.requests.fetch_add(1, AtomicOrdering::SeqCst);
        self.lock()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn with_defaults(state: &mut State, policy: &TablePolicy, row: Value) -> Result<Value> {
    let Value::Object(mut obj) = row else {
        return Err(Error::backend("Row must be a JSON object"));
    };

    obj.entry("id")
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    if !obj.contains_key("created_at") {
        let created_at = state.next_created_at();
        obj.insert(
            "created_at".to_string(),
            Value::String(created_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
    }
    for (column, default) in policy.defaults {
        obj.entry(*column).or_insert_with(default);
    }

    let id = obj.get("id").cloned();
    let rows = state.tables.get(policy.name);
    if rows.is_some_and(|rows| rows.iter().any(|r| r.get("id") == id.as_ref())) {
        return Err(Error::backend(format!(
            "duplicate key value violates unique constraint \"{}_pkey\"",
            policy.name
        )));
    }

    Ok(Value::Object(obj))
}

fn owned_by(row: &Value, policy: &TablePolicy, user_id: Uuid) -> bool {
    Filter::eq(policy.owner_column, user_id).matches(row)
}

fn rls_violation(table: &str) -> Error {
    Error::backend(format!(
        "new row violates row-level security policy for table \"{}\"",
        table
    ))
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn project(row: &Value, columns: &str) -> Value {
    if columns.trim() == "*" {
        return row.clone();
    }
    let picked: Map<String, Value> = columns
        .split(',')
        .map(str::trim)
        .filter_map(|c| row.get(c).map(|v| (c.to_string(), v.clone())))
        .collect();
    Value::Object(picked)
}

#[async_trait]
impl AuthApi for MemoryBackend {
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUp> {
        let mut state = self.begin()?;

        if !credentials.email.contains('@') {
            return Err(Error::backend(
                "Unable to validate email address: invalid format",
            ));
        }
        if credentials.password.len() < MIN_PASSWORD_LEN {
            return Err(Error::backend(format!(
                "Password should be at least {} characters.",
                MIN_PASSWORD_LEN
            )));
        }
        if state.accounts.contains_key(&credentials.email) {
            return Err(Error::backend("User already registered"));
        }

        let identity = Identity::new(Uuid::new_v4(), Some(credentials.email.clone()));
        state.accounts.insert(
            credentials.email.clone(),
            Account {
                identity: identity.clone(),
                password: credentials.password.clone(),
                confirmed: self.auto_confirm,
            },
        );

        let session = self
            .auto_confirm
            .then(|| state.issue_session(identity.clone(), self.token_lifetime_secs));

        Ok(SignUp {
            user: identity,
            session,
        })
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session> {
        let mut state = self.begin()?;

        let identity = match state.accounts.get(&credentials.email) {
            Some(account) if account.password == credentials.password => {
                if !account.confirmed {
                    return Err(Error::backend("Email not confirmed"));
                }
                account.identity.clone()
            }
            _ => return Err(Error::backend("Invalid login credentials")),
        };

        Ok(state.issue_session(identity, self.token_lifetime_secs))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let mut state = self.begin()?;

        let user_id = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| Error::backend("Invalid Refresh Token: Refresh Token Not Found"))?;
        let identity = state
            .identity(user_id)
            .ok_or_else(|| Error::backend("User not found"))?;

        Ok(state.issue_session(identity, self.token_lifetime_secs))
    }

    async fn get_user(&self, access_token: &str) -> Result<Identity> {
        let state = self.begin()?;
        let user_id = state.caller(access_token)?;
        state
            .identity(user_id)
            .ok_or_else(|| Error::backend("User not found"))
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let mut state = self.begin()?;
        let user_id = state.caller(access_token)?;
        state.access_tokens.retain(|_, t| t.user_id != user_id);
        state.refresh_tokens.retain(|_, owner| *owner != user_id);
        Ok(())
    }
}

#[async_trait]
impl TableApi for MemoryBackend {
    async fn select(&self, access_token: &str, query: &Select) -> Result<Vec<Value>> {
        let state = self.begin()?;
        let caller = state.caller(access_token)?;
        let policy = policy(&query.table)?;

        let mut rows: Vec<&Value> = state
            .tables
            .get(policy.name)
            .map(|rows| {
                rows.iter()
                    .filter(|r| owned_by(r, policy, caller))
                    .filter(|r| query.filters.iter().all(|f| f.matches(r)))
                    .collect()
            })
            .unwrap_or_default();

        if let Some(Order { column, ascending }) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(column), b.get(column));
                if *ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }

        Ok(rows.into_iter().map(|r| project(r, &query.columns)).collect())
    }

    async fn insert(&self, access_token: &str, table: &str, row: Value) -> Result<()> {
        let mut state = self.begin()?;
        let caller = state.caller(access_token)?;
        let policy = policy(table)?;

        if !owned_by(&row, policy, caller) {
            return Err(rls_violation(table));
        }

        let row = with_defaults(&mut state, policy, row)?;
        state.rows_mut(table).push(row);
        Ok(())
    }

    async fn update(
        &self,
        access_token: &str,
        table: &str,
        patch: Value,
        filters: &[Filter],
    ) -> Result<()> {
        let mut state = self.begin()?;
        let caller = state.caller(access_token)?;
        let policy = policy(table)?;

        let Value::Object(patch) = patch else {
            return Err(Error::backend("Patch must be a JSON object"));
        };
        if let Some(owner) = patch.get(policy.owner_column) {
            if owner.as_str() != Some(caller.to_string().as_str()) {
                return Err(rls_violation(table));
            }
        }

        for row in state.rows_mut(table).iter_mut() {
            let matched = {
                let current: &Value = row;
                owned_by(current, policy, caller) && filters.iter().all(|f| f.matches(current))
            };
            if let (true, Value::Object(obj)) = (matched, row) {
                for (column, value) in &patch {
                    obj.insert(column.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, access_token: &str, table: &str, filters: &[Filter]) -> Result<()> {
        let mut state = self.begin()?;
        let caller = state.caller(access_token)?;
        let policy = policy(table)?;

        state
            .rows_mut(table)
            .retain(|row| !(owned_by(row, policy, caller) && filters.iter().all(|f| f.matches(row))));
        Ok(())
    }
}
