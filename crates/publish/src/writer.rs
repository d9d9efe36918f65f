//! Materializes a set of objects as a fresh publication directory.

use crate::error::{PublishError, Result};
use crate::paths::object_path;
use crate::retention::cleanup_old_target_directories;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use rsyncit_core::{Config, RpkiObject};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File, OpenOptions, Permissions};
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt, symlink};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use time::macros::{datetime, format_description};
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// mtime given to every directory inside a publication tree. A constant
/// value keeps rsync from seeing directory changes between publications.
pub const INTERNAL_DIRECTORY_LAST_MODIFIED_TIME: OffsetDateTime =
    datetime!(2000-01-01 00:00:00 UTC);

pub const DIRECTORY_PERMISSIONS: u32 = 0o755;
pub const FILE_PERMISSIONS: u32 = 0o644;

/// Name of the symlink rsyncd serves from.
pub const PUBLISHED_SYMLINK: &str = "published";

fn format_directory_timestamp(now: OffsetDateTime) -> Result<String> {
    Ok(now.to_offset(UtcOffset::UTC).format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]"
    ))?)
}

/// `<base>/published-<UTC timestamp with microseconds>`
pub fn generate_publication_directory_path(base: &Path, now: OffsetDateTime) -> Result<PathBuf> {
    Ok(base.join(format!("published-{}", format_directory_timestamp(now)?)))
}

pub struct RsyncWriter {
    config: Config,
    pool: Arc<ThreadPool>,
}

impl RsyncWriter {
    /// Create a writer with its own pool sized at twice the available cores.
    pub fn new(config: Config) -> Result<Self> {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get() * 2)
            .unwrap_or(4);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("rsync-writer-{i}"))
            .build()
            .map_err(|e| PublishError::WorkerPool(e.to_string()))?;
        Ok(Self::with_pool(config, Arc::new(pool)))
    }

    pub fn with_pool(config: Config, pool: Arc<ThreadPool>) -> Self {
        Self { config, pool }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Publish `objects` as a new directory, point the `published` symlink at
    /// it and prune directories that fell out of retention.
    ///
    /// Returns the path of the new publication directory.
    #[instrument(skip(self, objects), fields(objects = objects.len()))]
    pub fn write_objects(&self, objects: &[RpkiObject], now: OffsetDateTime) -> Result<PathBuf> {
        let base = &self.config.target_directory;
        ensure_base_directory(base)?;

        let target = self.write_objects_to_new_directory(base, objects, now)?;
        replace_published_symlink(base, &target)?;
        info!(target = %target.display(), "Published new directory");

        self.prune_old_directories(base, now);
        Ok(target)
    }

    /// Retention runs after `published` has moved, so its failures are only
    /// logged. Returns the directories selected for deletion.
    fn prune_old_directories(&self, base: &Path, now: OffsetDateTime) -> Vec<PathBuf> {
        match cleanup_old_target_directories(
            base,
            now - self.config.retention_period,
            self.config.retention_copies_count,
            &self.pool,
        ) {
            Ok(removed) => removed,
            Err(e) => {
                warn!(base = %base.display(), error = %e, "Cleaning up old publication directories failed");
                Vec::new()
            }
        }
    }

    fn write_objects_to_new_directory(
        &self,
        base: &Path,
        objects: &[RpkiObject],
        now: OffsetDateTime,
    ) -> Result<PathBuf> {
        let stamp = format_directory_timestamp(now)?;
        let target = base.join(format!("published-{stamp}"));
        if fs::symlink_metadata(&target).is_ok() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", target.display()),
            )
            .into());
        }

        let temp = base.join(format!("tmp-{stamp}-{}", Uuid::new_v4().as_u64_pair().0));
        fs::create_dir(&temp)?;

        let result = self.populate(&temp, objects).and_then(|()| {
            set_directory_attributes(&temp, now)?;
            fs::rename(&temp, &target)?;
            Ok(())
        });

        if let Err(e) = result {
            if let Err(cleanup) = fs::remove_dir_all(&temp) {
                warn!(temp = %temp.display(), error = %cleanup, "Failed to remove temporary directory");
            }
            return Err(e);
        }
        Ok(target)
    }

    fn populate(&self, root: &Path, objects: &[RpkiObject]) -> Result<()> {
        let mut by_host: BTreeMap<String, Vec<(PathBuf, &RpkiObject)>> = BTreeMap::new();
        for object in objects {
            match object_path(&object.url) {
                Some(location) => by_host
                    .entry(location.host)
                    .or_default()
                    .push((location.relative, object)),
                None => error!(url = %object.url, "The object was skipped: its URL does not map into the host directory"),
            }
        }

        let mut directories = BTreeSet::new();
        let mut files = Vec::with_capacity(objects.len());
        for (host, entries) in by_host {
            let host_dir = root.join(&host);
            for (relative, object) in entries {
                let path = host_dir.join(relative);
                let mut parent = path.parent();
                while let Some(dir) = parent
                    && dir != root
                {
                    directories.insert(dir.to_path_buf());
                    parent = dir.parent();
                }
                files.push((path, object));
            }
        }
        debug!(
            files = files.len(),
            directories = directories.len(),
            "Writing publication tree"
        );

        self.pool.install(|| {
            directories
                .par_iter()
                .try_for_each(fs::create_dir_all)?;
            files
                .par_iter()
                .try_for_each(|(path, object)| write_object(path, object))?;
            // Writing files bumps directory mtimes, so these go last.
            directories
                .par_iter()
                .try_for_each(|dir| set_directory_attributes(dir, INTERNAL_DIRECTORY_LAST_MODIFIED_TIME))
        })
    }
}

fn ensure_base_directory(base: &Path) -> Result<()> {
    match fs::metadata(base) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(PublishError::InvalidBaseDirectory(format!(
            "{} is not a directory",
            base.display()
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            fs::create_dir_all(base)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn write_object(path: &Path, object: &RpkiObject) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(FILE_PERMISSIONS)
        .open(path)?;
    file.write_all(&object.bytes)?;
    file.set_permissions(Permissions::from_mode(FILE_PERMISSIONS))?;
    file.set_modified(SystemTime::from(object.modification_time))?;
    Ok(())
}

fn set_directory_attributes(dir: &Path, modified: OffsetDateTime) -> Result<()> {
    fs::set_permissions(dir, Permissions::from_mode(DIRECTORY_PERMISSIONS))?;
    File::open(dir)?.set_modified(SystemTime::from(modified))?;
    Ok(())
}

/// Swap `published` over to `target` with a rename, so readers never see a
/// missing link. The link is relative to the base directory.
#[instrument(skip_all, fields(target = %target.display()))]
fn replace_published_symlink(base: &Path, target: &Path) -> Result<()> {
    let name = target.file_name().ok_or_else(|| {
        PublishError::InvalidBaseDirectory(format!("{} has no file name", target.display()))
    })?;
    let link = base.join(PUBLISHED_SYMLINK);
    let staged = base.join(format!("{PUBLISHED_SYMLINK}-{}.lnk", Uuid::new_v4().simple()));

    symlink(name, &staged)?;
    if let Err(e) = fs::rename(&staged, &link) {
        let _ = fs::remove_file(&staged);
        return Err(e.into());
    }
    Ok(())
}
