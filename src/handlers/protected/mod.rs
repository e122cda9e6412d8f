// handlers/protected/mod.rs - Protected handlers (signed-in user required)
//
// Every route here sits behind `require_user`, which supplies the session.

pub mod user;
