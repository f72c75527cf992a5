/// Shared application state handed to every handler
use crate::config::LimitsConfig;
use crate::db::Stores;
use crate::services::{
    CommentService, FeedAssembler, FollowService, LikeService, PostService, SearchService,
    UserDirectory,
};
use crate::storage::MediaStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub users: UserDirectory,
    pub feed: FeedAssembler,
    pub posts: PostService,
    pub likes: LikeService,
    pub comments: CommentService,
    pub follows: FollowService,
    pub search: SearchService,
    pub media: Arc<dyn MediaStore>,
    pub limits: LimitsConfig,
}

impl AppState {
    pub fn new(
        stores: Stores,
        media: Arc<dyn MediaStore>,
        limits: LimitsConfig,
        external_id_prefix: &str,
    ) -> Self {
        let directory = UserDirectory::new(
            stores.users.clone(),
            media.clone(),
            external_id_prefix,
            limits.max_image_bytes,
        );

        Self {
            feed: FeedAssembler::new(
                stores.posts.clone(),
                stores.users.clone(),
                directory.clone(),
                &limits,
            ),
            posts: PostService::new(
                stores.posts.clone(),
                media.clone(),
                directory.clone(),
                limits.max_image_bytes,
            ),
            likes: LikeService::new(stores.likes.clone(), directory.clone()),
            comments: CommentService::new(
                stores.comments.clone(),
                stores.users.clone(),
                directory.clone(),
            ),
            follows: FollowService::new(stores.follows.clone(), directory.clone()),
            search: SearchService::new(stores.users.clone(), stores.posts.clone(), &limits),
            users: directory,
            media,
            limits,
        }
    }
}
