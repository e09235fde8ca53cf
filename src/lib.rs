pub mod config;
pub mod editor;
pub mod error;
pub mod input;
pub mod logging;
pub mod terminal;
pub mod tree;
pub mod ui;
pub mod util;

#[cfg(test)]
mod test_support;

pub use editor::{run_input_session, select_option, SessionOptions, SessionOutcome};
pub use error::{EditorError, RenderError};
pub use tree::{ComponentTree, View};
