pub mod api;
pub mod auth;
pub mod stream;

pub use api::{RedditApiClient, RedditListing, RedditPostData};
pub use auth::AppOnlyAuth;
pub use stream::{StreamPacing, SubmissionStream, SubredditSource};
