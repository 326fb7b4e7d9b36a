pub mod analyse;
pub mod apply;
pub mod history;
pub mod populate;
pub mod project;
pub mod util;

pub use analyse::*;
pub use apply::*;
pub use history::*;
pub use populate::*;
pub use project::*;
pub use util::*;
