use std::path::Path;

pub trait FsOps {
    fn path_exists(&self, path: &Path) -> bool;
}
