mod announcement;
mod message;
mod moderation_log;
mod post;
mod tag;
mod user;

pub use announcement::*;
pub use message::*;
pub use moderation_log::*;
pub use post::*;
pub use tag::*;
pub use user::*;
