pub mod client;
mod globals;
pub mod interaction;

pub use client::{LuaClient, SerenityRegistrar};
pub use interaction::{LuaInteraction, Responder, SerenityResponder};

/// Creates the Luau state that every handler module is loaded into.
pub fn create_lua_state() -> mlua::Result<mlua::Lua> {
    let lua = mlua::Lua::new_with(
        {
            use mlua::StdLib as SL;
            SL::COROUTINE | SL::MATH | SL::STRING | SL::TABLE | SL::UTF8
        },
        mlua::LuaOptions::new().catch_rust_panics(true),
    )?;

    globals::register(&lua)?;

    Ok(lua)
}
