//! Client side of a StudyBot conversation
//!
//! [`machine`] decides what happens next, [`controller::ChatController`]
//! makes it happen over a [`transport::ChatTransport`] and shows it through a
//! [`view::ChatView`].

pub mod controller;
pub mod error;
pub mod input;
pub mod machine;
pub mod renderer;
pub mod transport;
pub mod view;

pub use controller::ChatController;
pub use input::InputGate;
pub use machine::RetryPolicy;
pub use transport::{ChatTransport, HttpTransport};
pub use view::{CaptureView, TerminalView};
