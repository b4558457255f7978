pub mod app;
pub mod backend;
pub mod image;
pub mod input;
pub mod poller;
pub mod selection;
pub mod session;
pub mod view;

#[cfg(test)]
mod testing;

pub use app::ModelChatApp;
pub use backend::{HttpBackend, ModelBackend};
pub use image::ImageAttachment;
pub use input::{action_for, InputAction, Key, KeyPress, MessageComposer};
pub use poller::{PollEnd, PollState, StatusPoller};
pub use selection::{Selection, SelectionReader};
pub use session::{ChatSession, SendGate};
pub use view::{MessageSink, StatusDisplay, Transcript};
