pub mod ticket_draws;
pub mod tickets;

pub use ticket_draws as ticket_draw_entity;
pub use tickets as ticket_entity;
