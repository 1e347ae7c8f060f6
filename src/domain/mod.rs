pub mod feed;
pub mod follow;
pub mod post;
pub mod user;

pub use feed::{Feed, FeedWithOwner};
pub use follow::{FeedFollow, FollowedFeed};
pub use post::{is_storable_date, NewPost, Post};
pub use user::User;
