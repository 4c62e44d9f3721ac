use mlua::{Value, Variadic};

pub fn register(lua: &mlua::Lua) -> mlua::Result<()> {
    lua.globals().set(
        "sleep",
        lua.create_async_function(|_lua, ms: u32| async move {
            tokio::time::sleep(std::time::Duration::from_millis(ms as u64)).await;
            Ok(())
        })?,
    )?;

    lua.globals().set(
        "yield",
        lua.globals()
            .get("coroutine")
            .and_then(|c: mlua::Table| c.get::<mlua::Function>("yield"))?,
    )?;

    lua.globals().set(
        "print",
        lua.create_function(|_lua, values: Variadic<Value>| {
            tracing::info!(target: "lua", "{}", join(values)?);
            Ok(())
        })?,
    )?;

    let log = lua.create_table()?;
    log.set(
        "info",
        lua.create_function(|_lua, values: Variadic<Value>| {
            tracing::info!(target: "lua", "{}", join(values)?);
            Ok(())
        })?,
    )?;
    log.set(
        "warn",
        lua.create_function(|_lua, values: Variadic<Value>| {
            tracing::warn!(target: "lua", "{}", join(values)?);
            Ok(())
        })?,
    )?;
    log.set(
        "error",
        lua.create_function(|_lua, values: Variadic<Value>| {
            tracing::error!(target: "lua", "{}", join(values)?);
            Ok(())
        })?,
    )?;
    lua.globals().set("log", log)?;

    Ok(())
}

/// Formats each value the way Lua's `tostring` would
fn join(values: Variadic<Value>) -> mlua::Result<String> {
    Ok(values
        .iter()
        .map(Value::to_string)
        .collect::<mlua::Result<Vec<_>>>()?
        .join("\t"))
}
