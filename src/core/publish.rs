//! Publish step: replace the served directory with the build output.
//!
//! Mirrors `rm -rf <publish>/* && cp -R <build>/* <publish>` from the
//! original deployment script. Destructive and not atomic: a failure
//! mid-copy can leave the publish directory partially populated.

use std::fs;
use std::io;
use std::path::Path;

/// Delete everything under `publish_dir`, then copy the full contents of
/// `build_output_dir` into it. The build output is never modified.
pub fn replace_dir_contents(build_output_dir: &Path, publish_dir: &Path) -> io::Result<()> {
    if !build_output_dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("build output missing: {}", build_output_dir.display()),
        ));
    }

    clear_dir(publish_dir)?;
    copy_tree(build_output_dir, publish_dir)
}

/// Remove all entries of `dir`, creating it if absent
fn clear_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)?;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }

    Ok(())
}

/// Recursively copy the contents of `src` into `dst`
fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}
