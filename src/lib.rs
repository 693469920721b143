pub mod client;
pub mod config;
pub mod console;
pub mod model;
pub mod poll;
pub mod ui;
pub mod view;

pub use config::Config;
pub use console::{Console, ConsoleState, Toast, ToastKind};
pub use model::{DemoUser, Event, EventType, Notification};
