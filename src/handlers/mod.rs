pub mod health;
pub mod doc_presence;
pub mod diagnostics;

pub use health::*;
pub use doc_presence::*;
pub use diagnostics::*;
