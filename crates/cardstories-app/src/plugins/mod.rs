// Built-in update handlers, one per update kind, plus the sound cue board.

pub mod audio;
pub mod bot;
pub mod chat;
pub mod game;
pub mod table;
pub mod tabs;

pub use bot::BotPlugin;
pub use chat::ChatPlugin;
pub use game::GamePlugin;
pub use table::TablePlugin;
pub use tabs::TabsPlugin;
