use taskvault_common::{NewTask, Task, TaskPatch};
use uuid::Uuid;

use super::{decode_rows, encode};
use crate::backend::{Filter, Select, TableApi};
use crate::error::Result;

pub const TABLE: &str = "tasks";

/// All tasks owned by `owner`, newest first.
pub async fn list(api: &dyn TableApi, access_token: &str, owner: Uuid) -> Result<Vec<Task>> {
    let query = Select::from(TABLE)
        .eq("user_id", owner)
        .order("created_at", false);
    let rows = api.select(access_token, &query).await?;
    decode_rows(rows)
}

pub async fn create(api: &dyn TableApi, access_token: &str, task: &NewTask) -> Result<()> {
    api.insert(access_token, TABLE, encode(task)?).await
}

pub async fn update(
    api: &dyn TableApi,
    access_token: &str,
    id: Uuid,
    patch: &TaskPatch,
) -> Result<()> {
    api.update(access_token, TABLE, encode(patch)?, &[Filter::eq("id", id)])
        .await
}

pub async fn delete(api: &dyn TableApi, access_token: &str, id: Uuid) -> Result<()> {
    api.delete(access_token, TABLE, &[Filter::eq("id", id)]).await
}
