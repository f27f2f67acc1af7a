use taskvault_common::{NewProfile, Profile};
use uuid::Uuid;

use super::{decode_rows, encode};
use crate::backend::{Select, TableApi};
use crate::error::{Error, Result};

pub const TABLE: &str = "profiles";

/// The profile row for `id`, or `None` when it has not been created yet.
pub async fn fetch(api: &dyn TableApi, access_token: &str, id: Uuid) -> Result<Option<Profile>> {
    let rows = api
        .select(access_token, &Select::from(TABLE).eq("id", id))
        .await?;

    let mut profiles: Vec<Profile> = decode_rows(rows)?;
    match profiles.len() {
        0 => Ok(None),
        1 => Ok(profiles.pop()),
        n => Err(Error::backend(format!(
            "JSON object requested, multiple ({}) rows returned",
            n
        ))),
    }
}

pub async fn create(api: &dyn TableApi, access_token: &str, profile: &NewProfile) -> Result<()> {
    api.insert(access_token, TABLE, encode(profile)?).await
}
