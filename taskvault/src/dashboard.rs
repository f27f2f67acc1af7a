//! Task dashboard for one signed-in identity.
//!
//! Every mutation is "fire, check error, refresh list": nothing is patched
//! in memory, the list shown is always the last one fetched.

use std::sync::Arc;

use taskvault_common::{Identity, NewProfile, NewTask, Profile, Task, TaskPatch};
use uuid::Uuid;

use crate::backend::TableApi;
use crate::error::{Error, Result};
use crate::repo::{profiles, tasks};
use crate::session::SessionManager;

pub struct Dashboard {
    session: Arc<SessionManager>,
    tables: Arc<dyn TableApi>,
    identity: Identity,
    profile: Option<Profile>,
    tasks: Vec<Task>,
    title: String,
}

impl Dashboard {
    pub fn new(session: Arc<SessionManager>, tables: Arc<dyn TableApi>, identity: Identity) -> Self {
        Self {
            session,
            tables,
            identity,
            profile: None,
            tasks: Vec::new(),
            title: String::new(),
        }
    }

    /// Dashboard for the session's current identity.
    pub async fn for_current_identity(
        session: Arc<SessionManager>,
        tables: Arc<dyn TableApi>,
    ) -> Result<Self> {
        let identity = session.current_identity().await.ok_or(Error::NotSignedIn)?;
        Ok(Self::new(session, tables, identity))
    }

    /// Initial load: profile then tasks. Both run even if the first fails;
    /// the first error is returned.
    pub async fn mount(&mut self) -> Result<()> {
        let profile = self.load_profile().await;
        let tasks = self.load_tasks().await;
        profile.and(tasks)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Pending input of the "new task" field.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Fetch the profile row, creating it with a derived username on first
    /// visit. Creation is followed by exactly one re-fetch.
    pub async fn load_profile(&mut self) -> Result<()> {
        let token = self.session.access_token().await?;
        let api = self.tables.as_ref();

        let profile = match profiles::fetch(api, &token, self.identity.id).await? {
            Some(profile) => profile,
            None => {
                let new_profile = NewProfile::for_identity(&self.identity);
                tracing::info!(
                    user_id = %self.identity.id,
                    username = %new_profile.username,
                    "Creating profile"
                );
                profiles::create(api, &token, &new_profile).await?;
                profiles::fetch(api, &token, self.identity.id)
                    .await?
                    .ok_or_else(|| Error::backend("Profile not found after creation"))?
            }
        };

        self.profile = Some(profile);
        Ok(())
    }

    /// Replace the task list with the owner's tasks, newest first.
    pub async fn load_tasks(&mut self) -> Result<()> {
        let token = self.session.access_token().await?;
        self.tasks = tasks::list(self.tables.as_ref(), &token, self.identity.id).await?;
        Ok(())
    }

    /// Insert the pending title as a new task.
    ///
    /// Returns `false` without contacting the backend when the title trims to
    /// nothing. On success the input is cleared and the list reloaded.
    pub async fn add_task(&mut self) -> Result<bool> {
        let Some(new_task) = NewTask::from_input(self.identity.id, &self.title) else {
            return Ok(false);
        };

        let token = self.session.access_token().await?;
        tasks::create(self.tables.as_ref(), &token, &new_task).await?;
        tracing::debug!(title = %new_task.title, "Task added");

        self.title.clear();
        self.load_tasks().await?;
        Ok(true)
    }

    /// Set the task's `is_done` to the negation of the given snapshot.
    pub async fn toggle_done(&mut self, task: &Task) -> Result<()> {
        let token = self.session.access_token().await?;
        tasks::update(self.tables.as_ref(), &token, task.id, &TaskPatch::toggled(task)).await?;
        self.load_tasks().await
    }

    pub async fn remove_task(&mut self, task_id: Uuid) -> Result<()> {
        let token = self.session.access_token().await?;
        tasks::delete(self.tables.as_ref(), &token, task_id).await?;
        self.load_tasks().await
    }

    pub async fn sign_out(&self) {
        self.session.sign_out().await;
    }
}
