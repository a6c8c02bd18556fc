//! Ratatui front-end: the song list with its search and filters, the song
//! detail screen, and the admin forms.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
