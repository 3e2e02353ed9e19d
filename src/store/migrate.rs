use crate::store::keys;
use crate::store::operations::draws::DrawResult;
use crate::store::{Store, StoreError};

const VERSION_KEY: &str = "_meta:version";

type MigrationFn = fn(&Store) -> Result<(), StoreError>;

fn migrations() -> Vec<(&'static str, MigrationFn)> {
    vec![
        ("001_initial", m001_initial),
        ("002_draw_date_index", m002_draw_date_index),
    ]
}

/// Run every unapplied migration, checkpointing the version after each one.
/// Migrations must be idempotent: a crash between a migration and its
/// `set_version` means the migration reruns on the next start.
pub fn run(store: &Store) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    let all = migrations();

    for (index, (name, func)) in all.iter().enumerate() {
        let version = (index + 1) as u32;
        if version > current {
            tracing::info!(version, name, "Running migration");
            func(store)?;
            set_version(store, version)?;
            tracing::info!(version, name, "Migration complete");
        } else {
            tracing::debug!(version, name, "Migration already applied, skipping");
        }
    }

    Ok(())
}

pub fn get_current_version(store: &Store) -> Result<u32, StoreError> {
    match store.schema_meta.get(VERSION_KEY.as_bytes())? {
        Some(raw) => {
            if raw.len() == 4 {
                let bytes: [u8; 4] = raw.as_ref().try_into().unwrap_or([0; 4]);
                Ok(u32::from_be_bytes(bytes))
            } else {
                let text = String::from_utf8(raw.to_vec()).unwrap_or_else(|_| "0".to_string());
                Ok(text.parse::<u32>().unwrap_or(0))
            }
        }
        None => Ok(0),
    }
}

pub fn set_version(store: &Store, version: u32) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    if version < current {
        return Err(StoreError::Migration {
            version,
            message: format!("Refuse to downgrade from {} to {}", current, version),
        });
    }

    store
        .schema_meta
        .insert(VERSION_KEY.as_bytes(), &version.to_be_bytes())?;
    Ok(())
}

fn m001_initial(_store: &Store) -> Result<(), StoreError> {
    Ok(())
}

/// Rebuild the date index from primary draw data. Idempotent: inserting an
/// existing index entry is a no-op overwrite.
fn m002_draw_date_index(store: &Store) -> Result<(), StoreError> {
    for item in store.draws.iter() {
        let (_, value) = item?;
        let draw: DrawResult = Store::deserialize(&value)?;
        let index_key = keys::draw_date_index_key(draw.draw_date, draw.round);
        store
            .draws_by_date
            .insert(index_key.as_bytes(), keys::draw_key(draw.round).as_bytes())?;
    }

    Ok(())
}
