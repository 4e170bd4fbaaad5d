/// Creation parameters for a graphics module.
///
/// Passed to `SynkWindow::extract_with`; `extract` uses the default.
#[derive(Debug, Clone)]
pub struct GraphicsInit {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Initial vertical-sync state.
    pub vsync: bool,

    pub power_preference: wgpu::PowerPreference,

    /// Surface alpha mode. Falls back to a supported mode when unavailable.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub required_features: wgpu::Features,

    /// Limits requested from the device. `max_buffer_size` also caps headless buffers.
    pub required_limits: wgpu::Limits,

    /// Hint; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GraphicsInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            vsync: true,
            power_preference: wgpu::PowerPreference::HighPerformance,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}
