// HTTP routes
pub mod chapters;
pub mod download;
pub mod health;
pub mod stream;
pub mod trace;

pub use chapters::*;
pub use download::*;
pub use health::*;
pub use stream::*;
pub use trace::*;
