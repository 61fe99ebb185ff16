use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used by the GPU resource layer.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Shader pipeline stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Errors raised while creating or using GPU resources.
///
/// Everything except `FrameInProgress` and `Present` happens during setup and is
/// treated as fatal by the runtime.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No candidate path yielded the requested asset.
    #[error(
        "failed to open '{name}' (executable directory: {}); tried:{}",
        display_exe_dir(.exe_dir),
        display_tried(.tried)
    )]
    ResourceNotFound {
        name: String,
        tried: Vec<PathBuf>,
        exe_dir: Option<PathBuf>,
    },

    /// The asset was found but is not valid UTF-8 text.
    #[error("'{}' is not valid UTF-8 text", .path.display())]
    InvalidSourceText { path: PathBuf },

    /// The driver rejected a shader stage.
    #[error("{stage} shader failed to compile:\n{log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    /// The driver rejected the program at link time.
    #[error("shader program failed to link:\n{log}")]
    ShaderLink { log: String },

    /// Window or GL context creation failed.
    #[error("context initialization failed: {0}")]
    ContextInit(String),

    /// An image could not be decoded into texture pixels.
    #[error("failed to load texture '{}': {reason}", .path.display())]
    TextureLoad { path: PathBuf, reason: String },

    /// Pixel data does not describe a `width × height` image of 1-4 channels.
    #[error("invalid pixel data: {0}")]
    InvalidPixels(String),

    /// The driver refused to allocate an object.
    #[error("driver error: {0}")]
    Driver(String),

    /// An index addresses a vertex the linked buffers do not contain.
    #[error("index {max_index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { max_index: u32, vertex_count: u32 },

    /// A vertex attribute declares no components, or more than four.
    #[error("vertex attribute slot {slot} has {components} components (expected 1-4)")]
    InvalidAttribute { slot: u32, components: u8 },

    /// An indexed draw was requested on a vertex array without an index buffer.
    #[error("vertex array has no index buffer")]
    MissingIndexBuffer,

    /// `render_frame` was entered while another frame was still recording.
    #[error("a frame is already in progress")]
    FrameInProgress,

    /// A draw or present was requested outside `begin_frame` / `end_frame`.
    #[error("no frame in progress")]
    FrameNotStarted,

    /// The windowing collaborator failed to present the frame.
    #[error("failed to present frame: {0}")]
    Present(String),
}

fn display_exe_dir(dir: &Option<PathBuf>) -> String {
    match dir {
        Some(d) => d.display().to_string(),
        None => "unknown".to_string(),
    }
}

fn display_tried(tried: &[PathBuf]) -> String {
    tried
        .iter()
        .map(|p| format!("\n  - {}", p.display()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_lists_every_path() {
        let err = RenderError::ResourceNotFound {
            name: "default.vert".into(),
            tried: vec![PathBuf::from("default.vert"), PathBuf::from("a/default.vert")],
            exe_dir: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("executable directory: unknown"));
        assert!(msg.contains("\n  - default.vert"));
        assert!(msg.contains("\n  - a/default.vert"));
    }

    #[test]
    fn compile_error_names_stage() {
        let err = RenderError::ShaderCompile {
            stage: ShaderStage::Fragment,
            log: "0:1: syntax error".into(),
        };
        assert_eq!(err.to_string(), "fragment shader failed to compile:\n0:1: syntax error");
    }
}
