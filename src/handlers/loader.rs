use std::path::{Path, PathBuf};

use mlua::prelude::*;
use serenity::futures::future::join_all;

use super::HandlerModule;
use crate::error::LoadError;

/// The result of loading one handler file
pub struct LoadOutcome<H> {
    pub path: PathBuf,
    pub result: Result<H, LoadError>,
}

/// Lists the files in `directory` with the given extension, sorted by path.
pub async fn discover(directory: &Path, extension: &str) -> Result<Vec<PathBuf>, LoadError> {
    let io_error = |source| LoadError::Io {
        path: directory.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(directory).await.map_err(io_error)?;
    let mut files = vec![];
    while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
        let path = entry.path();
        let is_file = entry.file_type().await.map_err(io_error)?.is_file();
        if is_file && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

/// Loads every matching file in `directory`.
///
/// All files are loaded concurrently and each one gets its own outcome, so a
/// broken module never prevents its siblings from loading. Only a directory
/// that cannot be listed fails the whole call.
pub async fn load_directory<H: HandlerModule>(
    lua: &Lua,
    directory: &Path,
    extension: &str,
) -> Result<Vec<LoadOutcome<H>>, LoadError> {
    let files = discover(directory, extension).await?;

    let outcomes = join_all(files.into_iter().map(|path| async move {
        let result = load_file::<H>(lua, &path).await;
        LoadOutcome { path, result }
    }))
    .await;

    Ok(outcomes)
}

pub async fn load_file<H: HandlerModule>(lua: &Lua, path: &Path) -> Result<H, LoadError> {
    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    load_source(lua, &path.display().to_string(), &source).await
}

pub async fn load_source<H: HandlerModule>(
    lua: &Lua,
    chunk_name: &str,
    source: &str,
) -> Result<H, LoadError> {
    let value = lua
        .load(source)
        .set_name(chunk_name)
        .eval_async::<LuaValue>()
        .await?;

    match value {
        LuaValue::Table(table) => H::from_table(lua, table),
        other => Err(LoadError::NotATable(other.type_name())),
    }
}
