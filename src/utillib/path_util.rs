use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Append `.extension` to the file name, keeping any existing
/// extension (unlike `Path::with_extension`). Returns None if `path`
/// has no file name.
pub fn add_extension(path: &Path, extension: &str) -> Option<PathBuf> {
    let mut file_name: OsString = path.file_name()?.to_os_string();
    file_name.push(".");
    file_name.push(extension);
    Some(path.with_file_name(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_add_extension() {
        assert_eq!(
            add_extension(Path::new("/out/12-00-00.csv"), "tmp"),
            Some(PathBuf::from("/out/12-00-00.csv.tmp"))
        );
        assert_eq!(add_extension(Path::new("/"), "tmp"), None);
    }
}
