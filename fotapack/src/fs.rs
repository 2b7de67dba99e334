use crate::Error;
use std::{
    fs,
    io::{self, Write},
    path::Path,
};
use tempfile::Builder;

pub fn read<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, Error> {
    let path = path.as_ref();
    fs::read(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `contents` to a temporary file next to `path` and rename it into
/// place, so `path` is either fully written or untouched.
pub fn write_atomic<P: AsRef<Path>>(path: P, contents: &[u8]) -> Result<(), Error> {
    let path = path.as_ref();
    let err = |source: io::Error| Error::WriteFile {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut builder = Builder::new();
    // new files get the mode a plain create would, existing ones keep theirs
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let mut file = builder.tempfile_in(dir).map_err(err)?;
    file.write_all(contents).map_err(err)?;
    if let Ok(meta) = fs::metadata(path) {
        file.as_file()
            .set_permissions(meta.permissions())
            .map_err(err)?;
    }
    file.persist(path).map_err(|e| err(e.error))?;

    log::trace!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}
