pub mod common;
pub mod draw;
pub mod ticket;

pub use common::*;
pub use draw::*;
pub use ticket::*;
