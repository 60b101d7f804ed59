#[macro_use]
mod macros;

pub(crate) mod constants;
pub(crate) mod cursor;
pub(crate) mod iter;
pub(crate) mod node;
mod states;
