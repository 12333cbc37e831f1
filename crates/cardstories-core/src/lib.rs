// Card Stories client core: wire protocol, poll session, game model,
// configuration, and player identity. No I/O beyond config files.

pub mod config;
pub mod game;
pub mod identity;
pub mod protocol;
pub mod session;
