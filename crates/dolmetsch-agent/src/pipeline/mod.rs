//! Channel-agnostic message pipeline.
//!
//! Channel adapters classify inbound text with [`Inbound::parse`], hand it to
//! the [`Dispatcher`] and implement [`Transport`] for the way back.

pub mod dispatch;
pub mod history;
pub mod slash;
pub mod transport;

pub use dispatch::{Dispatcher, Reply};
pub use slash::{Command, Inbound, COMMANDS};
pub use transport::{DeliveryError, Transport};
