/// Initialization parameters for the GL context.
///
/// Keep this structure small. Add flags only when a concrete platform
/// requirement exists.
#[derive(Debug, Clone)]
pub struct ContextInit {
    /// Requested core-profile version as `(major, minor)`.
    ///
    /// Shader sources target `#version 330 core`; lower versions will not link.
    pub gl_version: (u8, u8),

    /// Synchronize buffer swaps with the display refresh.
    pub vsync: bool,

    /// Ask for at least this many MSAA samples; `0` picks the config with the most.
    pub min_samples: u8,
}

impl Default for ContextInit {
    fn default() -> Self {
        Self {
            gl_version: (3, 3),
            vsync: true,
            min_samples: 0,
        }
    }
}
