pub mod diagnostics;
pub mod health;
pub mod initial_text;
pub mod users;

pub use diagnostics::*;
pub use health::*;
pub use initial_text::*;
pub use users::*;
