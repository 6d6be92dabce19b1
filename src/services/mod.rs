pub mod draw_service;
pub mod eligibility_service;
pub mod lifecycle_service;
pub mod quota_service;
pub mod selection;
pub mod ticket_service;

pub use draw_service::*;
pub use eligibility_service::*;
pub use lifecycle_service::*;
pub use quota_service::*;
pub use selection::*;
pub use ticket_service::*;
