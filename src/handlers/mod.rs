pub mod draw;
pub mod ticket;

pub use draw::draw_config;
pub use ticket::ticket_config;
