pub mod advisory;
pub mod crop;
pub mod reference;
pub mod rule;
pub mod weather;

pub use advisory::*;
pub use crop::*;
pub use reference::*;
pub use rule::*;
pub use weather::*;
