pub mod health;
pub mod diagnostics;
pub mod doc_presence;
pub mod error;
pub mod messages;
pub mod presence;

pub use health::*;
pub use diagnostics::*;
pub use doc_presence::*;
pub use error::*;
pub use messages::*;
pub use presence::*;
