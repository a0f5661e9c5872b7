mod posts;
mod schema;
mod types;

pub use schema::Database;
pub use types::{BookPost, DatabaseError, PostFields, PostKind};
