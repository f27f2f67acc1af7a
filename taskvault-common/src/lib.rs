//! TaskVault Common Types
//!
//! Records shared by the session manager, the backends and the dashboard.

pub mod identity;
pub mod profile;
pub mod task;

pub use identity::{AuthEventKind, Identity, IdentityChange, Session};
pub use profile::{default_username, NewProfile, Profile};
pub use task::{NewTask, Task, TaskPatch};
