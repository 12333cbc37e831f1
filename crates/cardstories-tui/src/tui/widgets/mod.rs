// TUI widget modules for each screen panel.

pub mod board;
pub mod chat;
pub mod dialog;
pub mod help;
pub mod players;
pub mod status_bar;
pub mod tabs;
