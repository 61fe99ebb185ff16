//! Asset lookup.
//!
//! Shader sources and texture images are located by logical name through an
//! [`AssetResolver`], which searches working-directory and executable-relative
//! resource folders so binaries work both from the workspace and when installed.

mod resolver;

pub use resolver::{AssetResolver, ResolvedAsset, SHADER_DIR, TEXTURE_DIR};
