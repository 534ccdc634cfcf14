pub mod condition;
pub mod element;
pub mod watch;

pub use condition::*;
pub use element::*;
pub use watch::*;
