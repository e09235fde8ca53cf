//! Line editing: key model, bindings, the escape/paste state machine, the
//! editor state and the async session that drives it against a [`View`].
//!
//! [`View`]: crate::tree::View

pub mod bindings;
pub mod dispatch;
pub mod keys;
pub mod paste;
pub mod session;
pub mod state;

pub use bindings::{Action, KeyBindings};
pub use dispatch::{dispatch, Editor, EscapePress, Hooks, Outcome, Step};
pub use keys::{KeyCategory, KeyCode, KeyEvent, KeyModifiers};
pub use paste::{PasteDecoder, PasteState};
pub use session::{run_input_session, select_option, Interrupt, SessionOptions, SessionOutcome};
pub use state::{EditorOptions, EditorState, Effect, Geometry, HistoryEditPolicy};
