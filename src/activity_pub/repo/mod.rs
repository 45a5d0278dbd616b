mod actor_cache;
mod follow_repo;
mod note_repo;
mod xkey;

pub use actor_cache::ActorCache;
pub use follow_repo::FollowRepo;
pub use note_repo::{NoteRepo, StoredNote};
