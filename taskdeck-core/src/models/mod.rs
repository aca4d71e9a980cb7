mod contact;
mod opportunity;
mod project;
mod quote;
mod task;

pub use contact::*;
pub use opportunity::*;
pub use project::*;
pub use quote::*;
pub use task::*;
