//! TaskVault - authenticated to-do list client.
//!
//! Sign-in/sign-up, a per-user profile and a per-user task list, all
//! delegated to a hosted backend (Supabase auth + tables).

pub mod backend;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod prompt;
pub mod render;
pub mod repo;
pub mod session;
pub mod shell;
pub mod state;
pub mod store;

pub use backend::{AuthApi, Backend, MemoryBackend, SupabaseBackend, TableApi};
pub use config::Config;
pub use dashboard::Dashboard;
pub use error::{Error, Result};
pub use prompt::{PasswordPrompt, TerminalPrompt};
pub use session::{SessionManager, Subscription};
pub use state::AppState;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
