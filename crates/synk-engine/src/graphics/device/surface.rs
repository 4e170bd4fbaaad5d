/// Response to a failed frame acquisition.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering resumes next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM).
    Fatal,
}

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if caps.formats.is_empty() {
        return None;
    }

    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        if let Some(f) = preferred.into_iter().find(|f| caps.formats.contains(f)) {
            return Some(f);
        }
    }

    Some(caps.formats[0])
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Present mode for the requested sync state, if the surface offers one.
///
/// FIFO is always available; unsynced presentation prefers `Immediate` over `Mailbox`.
pub(crate) fn choose_present_mode(
    modes: &[wgpu::PresentMode],
    vsync: bool,
) -> Option<wgpu::PresentMode> {
    if vsync {
        return Some(wgpu::PresentMode::Fifo);
    }

    [wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox]
        .into_iter()
        .find(|m| modes.contains(m))
}

/// How to react to a failed acquire. A `Lost` right after a `Lost` means reconfiguring did
/// not bring the surface back.
pub(crate) fn classify_surface_error(
    err: &wgpu::SurfaceError,
    lost_before: bool,
) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost if lost_before => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            SurfaceErrorAction::Reconfigured
        }
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
        wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vsync_always_maps_to_fifo() {
        assert_eq!(choose_present_mode(&[], true), Some(wgpu::PresentMode::Fifo));
    }

    #[test]
    fn unsynced_prefers_immediate() {
        let modes = [
            wgpu::PresentMode::Fifo,
            wgpu::PresentMode::Mailbox,
            wgpu::PresentMode::Immediate,
        ];
        assert_eq!(
            choose_present_mode(&modes, false),
            Some(wgpu::PresentMode::Immediate)
        );
        assert_eq!(choose_present_mode(&[wgpu::PresentMode::Fifo], false), None);
    }

    #[test]
    fn out_of_memory_is_fatal() {
        assert_eq!(
            classify_surface_error(&wgpu::SurfaceError::OutOfMemory, false),
            SurfaceErrorAction::Fatal
        );
        assert_eq!(
            classify_surface_error(&wgpu::SurfaceError::Outdated, true),
            SurfaceErrorAction::Reconfigured
        );
    }

    #[test]
    fn lost_surface_is_fatal_when_reconfiguring_did_not_help() {
        assert_eq!(
            classify_surface_error(&wgpu::SurfaceError::Lost, false),
            SurfaceErrorAction::Reconfigured
        );
        assert_eq!(
            classify_surface_error(&wgpu::SurfaceError::Lost, true),
            SurfaceErrorAction::Fatal
        );
        assert_eq!(
            classify_surface_error(&wgpu::SurfaceError::Timeout, true),
            SurfaceErrorAction::SkipFrame
        );
    }
}
