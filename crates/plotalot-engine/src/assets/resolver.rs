use std::path::{Path, PathBuf};

use crate::error::{RenderError, Result};

/// Resource subdirectory searched for shader sources.
pub const SHADER_DIR: &str = "Resource_Files/Shaders";
/// Resource subdirectory searched for texture images.
pub const TEXTURE_DIR: &str = "Resource_Files/Textures";

/// A successfully resolved asset.
#[derive(Debug, Clone)]
pub struct ResolvedAsset {
    /// Candidate path that was read.
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Locates asset files across an ordered list of candidate paths.
///
/// For a logical name `name`, resource subdirectory `S`, working directory `W`
/// and executable directory `E`, candidates are tried in this order:
///
/// 1. `name`
/// 2. `W/S/name`
/// 3. `W/../S/name`
/// 4. `W/../../S/name`
/// 5. `E/name`
/// 6. `E/S/name`
/// 7. `E/../S/name`
///
/// The first candidate that opens and reads wins. `W` defaults to the process
/// working directory (plain relative paths). Candidates 5-7 exist only when the
/// executable directory is known.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    subdir: PathBuf,
    working_dir: Option<PathBuf>,
    exe_dir: Option<PathBuf>,
}

impl AssetResolver {
    /// Resolver for `subdir`, anchored at the process working directory and the
    /// running executable.
    pub fn new(subdir: impl Into<PathBuf>) -> Self {
        Self {
            subdir: subdir.into(),
            working_dir: None,
            exe_dir: current_exe_dir(),
        }
    }

    pub fn shaders() -> Self {
        Self::new(SHADER_DIR)
    }

    pub fn textures() -> Self {
        Self::new(TEXTURE_DIR)
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_exe_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.exe_dir = Some(dir.into());
        self
    }

    /// Drops the executable-relative candidates.
    pub fn without_exe_dir(mut self) -> Self {
        self.exe_dir = None;
        self
    }

    pub fn subdir(&self) -> &Path {
        &self.subdir
    }

    pub fn exe_dir(&self) -> Option<&Path> {
        self.exe_dir.as_deref()
    }

    /// Candidate paths for `name`, in lookup order.
    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let s = &self.subdir;
        let w = self.working_dir.clone().unwrap_or_default();

        let mut out = vec![
            PathBuf::from(name),
            w.join(s).join(name),
            w.join("..").join(s).join(name),
            w.join("..").join("..").join(s).join(name),
        ];
        if let Some(e) = &self.exe_dir {
            out.push(e.join(name));
            out.push(e.join(s).join(name));
            out.push(e.join("..").join(s).join(name));
        }
        out
    }

    /// Returns the bytes of the first readable candidate for `name`.
    pub fn resolve(&self, name: &str) -> Result<ResolvedAsset> {
        let tried = self.candidates(name);

        for path in &tried {
            match std::fs::read(path) {
                Ok(bytes) => {
                    log::debug!("resolved '{}' -> {} ({} bytes)", name, path.display(), bytes.len());
                    return Ok(ResolvedAsset {
                        path: path.clone(),
                        bytes,
                    });
                }
                Err(e) => log::trace!("'{}' not at {}: {}", name, path.display(), e),
            }
        }

        log::error!(
            "failed to open '{}' (executable directory: {})",
            name,
            self.exe_dir
                .as_deref()
                .map_or_else(|| "unknown".to_string(), |d| d.display().to_string())
        );
        for path in &tried {
            log::error!("  tried {}", path.display());
        }

        Err(RenderError::ResourceNotFound {
            name: name.to_string(),
            tried,
            exe_dir: self.exe_dir.clone(),
        })
    }

    /// Like [`resolve`](Self::resolve), additionally requiring UTF-8 content.
    pub fn resolve_text(&self, name: &str) -> Result<String> {
        let asset = self.resolve(name)?;
        String::from_utf8(asset.bytes).map_err(|_| RenderError::InvalidSourceText { path: asset.path })
    }
}

impl Default for AssetResolver {
    fn default() -> Self {
        Self::shaders()
    }
}

fn current_exe_dir() -> Option<PathBuf> {
    match std::env::current_exe() {
        Ok(exe) => exe.parent().map(Path::to_path_buf),
        Err(e) => {
            log::debug!("executable directory unavailable: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn candidate_order_is_stable() {
        let r = AssetResolver::new("Res")
            .with_working_dir("/w")
            .with_exe_dir("/e");
        let c = r.candidates("a.vert");
        assert_eq!(
            c,
            vec![
                PathBuf::from("a.vert"),
                PathBuf::from("/w/Res/a.vert"),
                PathBuf::from("/w/../Res/a.vert"),
                PathBuf::from("/w/../../Res/a.vert"),
                PathBuf::from("/e/a.vert"),
                PathBuf::from("/e/Res/a.vert"),
                PathBuf::from("/e/../Res/a.vert"),
            ]
        );
    }

    #[test]
    fn without_exe_dir_has_four_candidates() {
        let r = AssetResolver::shaders().without_exe_dir();
        assert_eq!(r.candidates("x").len(), 4);
        assert_eq!(r.candidates("x")[1], PathBuf::from("Resource_Files/Shaders/x"));
    }

    #[test]
    fn first_existing_candidate_wins() {
        let root = tempfile::tempdir().unwrap();
        let work = root.path().join("a").join("b");
        fs::create_dir_all(&work).unwrap();

        // Candidates 2 and 4 both exist; 2 comes first.
        write(&work.join("Shaders").join("s.frag"), b"near");
        write(&root.path().join("Shaders").join("s.frag"), b"far");

        let r = AssetResolver::new("Shaders")
            .with_working_dir(&work)
            .without_exe_dir();
        let asset = r.resolve("s.frag").unwrap();
        assert_eq!(asset.bytes, b"near");
        assert_eq!(asset.path, work.join("Shaders").join("s.frag"));
    }

    #[test]
    fn parent_directory_candidates_are_searched() {
        let root = tempfile::tempdir().unwrap();
        let work = root.path().join("a").join("b");
        fs::create_dir_all(&work).unwrap();
        write(&root.path().join("Shaders").join("s.frag"), b"far");

        let r = AssetResolver::new("Shaders")
            .with_working_dir(&work)
            .without_exe_dir();
        assert_eq!(r.resolve_text("s.frag").unwrap(), "far");
    }

    #[test]
    fn exe_dir_candidates_are_last() {
        let work = tempfile::tempdir().unwrap();
        let exe = tempfile::tempdir().unwrap();
        write(&exe.path().join("Shaders").join("v.vert"), b"from exe");

        let r = AssetResolver::new("Shaders")
            .with_working_dir(work.path())
            .with_exe_dir(exe.path());
        let asset = r.resolve("v.vert").unwrap();
        assert_eq!(asset.bytes, b"from exe");

        // A working-dir copy takes precedence once present.
        write(&work.path().join("Shaders").join("v.vert"), b"from work");
        assert_eq!(r.resolve("v.vert").unwrap().bytes, b"from work");
    }

    #[test]
    fn missing_asset_reports_every_attempt() {
        let work = tempfile::tempdir().unwrap();
        let exe = tempfile::tempdir().unwrap();
        let r = AssetResolver::new("Shaders")
            .with_working_dir(work.path())
            .with_exe_dir(exe.path());

        match r.resolve("nope.vert") {
            Err(RenderError::ResourceNotFound { name, tried, exe_dir }) => {
                assert_eq!(name, "nope.vert");
                assert_eq!(tried, r.candidates("nope.vert"));
                assert_eq!(exe_dir.as_deref(), Some(exe.path()));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unknown_exe_dir_is_reported() {
        let work = tempfile::tempdir().unwrap();
        let r = AssetResolver::new("Shaders")
            .with_working_dir(work.path())
            .without_exe_dir();
        let msg = r.resolve("nope.vert").unwrap_err().to_string();
        assert!(msg.contains("executable directory: unknown"), "{msg}");
    }

    #[test]
    fn non_utf8_text_is_rejected() {
        let work = tempfile::tempdir().unwrap();
        write(&work.path().join("Shaders").join("bin.frag"), &[0xff, 0xfe, 0x00]);
        let r = AssetResolver::new("Shaders")
            .with_working_dir(work.path())
            .without_exe_dir();
        assert!(r.resolve("bin.frag").is_ok());
        assert!(matches!(
            r.resolve_text("bin.frag"),
            Err(RenderError::InvalidSourceText { .. })
        ));
    }
}
