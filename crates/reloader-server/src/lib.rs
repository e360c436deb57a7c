pub mod app;
pub mod cli;
pub mod internal;

pub use app::run;
pub use cli::Args;
