//! Connections: configuration, transport, framing, the type-state client
//! and the session wrapper.

mod client;
mod config;
mod framed;
mod session;
mod stream;

pub use client::{
    Authenticated, Client, FetchedMessage, LoggedIn, NotAuthenticated, Selected, Transition,
};
pub use config::{Config, Security};
pub use framed::{Completion, FramedStream};
pub use session::Session;
pub use stream::{ImapStream, connect, create_tls_connector};
