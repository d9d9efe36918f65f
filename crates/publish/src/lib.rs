//! Writes RPKI objects into timestamped directory trees below the rsync
//! base directory and flips the `published` symlink to the newest one.

pub mod error;
pub mod paths;
pub mod retention;
pub mod writer;

pub use error::{PublishError, Result};
pub use paths::{ObjectPath, object_path};
pub use retention::{PUBLICATION_DIRECTORY_PATTERN, cleanup_old_target_directories};
pub use writer::{
    DIRECTORY_PERMISSIONS, FILE_PERMISSIONS, INTERNAL_DIRECTORY_LAST_MODIFIED_TIME,
    PUBLISHED_SYMLINK, RsyncWriter, generate_publication_directory_path,
};
