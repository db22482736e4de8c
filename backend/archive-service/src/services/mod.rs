mod announcement_service;
mod auth_service;
mod email;
mod media;
mod message_service;
mod moderation_log_service;
mod moderation_service;
mod oauth;
mod post_service;
mod session_store;
mod tag_service;
mod user_service;

pub use announcement_service::*;
pub use auth_service::*;
pub use email::*;
pub use media::*;
pub use message_service::*;
pub use moderation_log_service::*;
pub use moderation_service::*;
pub use oauth::*;
pub use post_service::*;
pub use session_store::*;
pub use tag_service::*;
pub use user_service::*;
