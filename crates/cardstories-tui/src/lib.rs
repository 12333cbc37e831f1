// Terminal front end for the Card Stories client.

pub mod tui;
