use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Clears the directory at path, or creates it, parents included.
pub fn clear_dir(dir: impl AsRef<Path>) -> io::Result<()> {
    let dir = dir.as_ref();
    match fs::symlink_metadata(dir) {
        Ok(meta) if meta.is_dir() => {
            // TODO: permissions and owner are not preserved when doing it like this. List
            // all entries and remove them one by one instead.
            fs::remove_dir_all(dir)?;
            fs::create_dir(dir)
        }
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "dir is not a dir",
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => fs::create_dir_all(dir),
        Err(e) => Err(e),
    }
}

/// Collects all files in the given directories, does not walk them recursively.
pub fn all_files<R>(folders: impl IntoIterator<Item = impl AsRef<Path>>) -> io::Result<R>
where
    R: FromIterator<PathBuf>,
{
    let iters: Result<Vec<_>, _> =
        folders.into_iter().map(|path| fs::read_dir(path)).collect();

    iters?
        .into_iter()
        .flatten()
        .map(|entry| entry.map(|entry| entry.path()))
        .collect()
}

/// The immediate subdirectories of `dir`, sorted by name.
pub fn sub_dirs(dir: impl AsRef<Path>) -> io::Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = all_files::<Vec<_>>([dir])?
        .into_iter()
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// The files directly inside `dir` whose extension is one of `extensions`, compared
/// case-insensitively, sorted by name.
pub fn files_with_extension(
    dir: impl AsRef<Path>,
    extensions: &[&str],
) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = all_files::<Vec<_>>([dir])?
        .into_iter()
        .filter(|path| path.is_file() && has_extension(path, extensions))
        .collect();
    files.sort();
    Ok(files)
}

pub fn has_extension(path: impl AsRef<Path>, extensions: &[&str]) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// One more than the largest number found in the file names of `dir`, or 0 if no file
/// name yields one. A missing `dir` counts as empty.
pub fn next_free_index<F>(dir: impl AsRef<Path>, num_extract: F) -> io::Result<u32>
where
    F: Fn(&str) -> Option<u32>,
{
    let all: Vec<PathBuf> = match all_files([dir]) {
        Ok(all) => all,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let next = all
        .iter()
        .filter_map(|path| path.file_name().and_then(|name| name.to_str()))
        .filter_map(num_extract)
        .max()
        .map(|max| max + 1)
        .unwrap_or(0);
    Ok(next)
}
