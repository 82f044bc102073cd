mod comment;
mod event;
mod post;
pub mod team;
pub mod user;

pub use comment::Comment;
pub use event::{Event, EventDraft, EventPatch};
pub use post::Post;
pub use team::{MemberDetail, UserTeam};
pub use user::{NewUser, User, UserInfo};
