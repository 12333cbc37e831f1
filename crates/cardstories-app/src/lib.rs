// Card Stories client runtime: transport, poll loop, actions, update
// handlers, animations, error surface, and the root controller.

pub mod actions;
pub mod animation;
pub mod app;
pub mod dispatch;
pub mod error;
pub mod panic;
pub mod plugins;
pub mod poller;
pub mod transport;
pub mod ui;
