// Serial Binder - API Core
//
// Turns the listing page of a web serial into one EPUB. Chapters are
// discovered, fetched in small waves, ordered and packaged; finished books
// are cached by job key. Clients follow a job live over a WebSocket bound
// to a trace id.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
