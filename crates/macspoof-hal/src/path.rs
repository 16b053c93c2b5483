use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Backup path for an address-holding file: the same path with `suffix` appended verbatim.
pub fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_suffix_to_dotfile() {
        assert_eq!(
            backup_path(Path::new("/efs/wifi/.mac.info"), ".bak"),
            PathBuf::from("/efs/wifi/.mac.info.bak")
        );
    }

    #[test]
    fn does_not_replace_existing_extension() {
        assert_eq!(
            backup_path(Path::new("/data/misc/wifi/nvram.txt"), ".orig"),
            PathBuf::from("/data/misc/wifi/nvram.txt.orig")
        );
    }
}
