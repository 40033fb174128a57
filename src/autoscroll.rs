//! Keeping the log window scrolled to the newest line.
//!
//! The cursor only follows new output while the user is somewhere else. Once
//! they move into the log window to read it, appends leave the cursor alone.

use crate::host::{HostError, SurfaceHandle, ViewHost, WindowId};

/// Outcome of the scroll decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No window is tracked.
    NoWindow,
    /// The user is in the log window.
    Focused,
    /// The tracked window is not among the live windows.
    Hidden,
    /// Move the cursor in this window to the last line.
    Scroll(WindowId),
}

/// Decide whether `tracked` should be scrolled.
pub fn decide(tracked: Option<WindowId>, focused: Option<WindowId>, live: &[WindowId]) -> Decision {
    let Some(window) = tracked else {
        return Decision::NoWindow;
    };
    if focused == Some(window) {
        return Decision::Focused;
    }
    if !live.contains(&window) {
        return Decision::Hidden;
    }
    Decision::Scroll(window)
}

/// Apply the scroll decision for `surface` against the host.
pub fn autoscroll<H: ViewHost>(
    host: &mut H,
    surface: Option<SurfaceHandle>,
) -> Result<Decision, HostError> {
    let decision = decide(
        surface.map(|s| s.window),
        host.current_window(),
        &host.list_windows(),
    );
    if let (Decision::Scroll(window), Some(surface)) = (decision, surface) {
        let last = host.line_count(surface.buffer)?.max(1);
        host.set_cursor(window, last, 0)?;
    }
    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: WindowId = WindowId(7);
    const OTHER: WindowId = WindowId(3);

    #[test]
    fn nothing_tracked() {
        assert_eq!(decide(None, Some(OTHER), &[OTHER]), Decision::NoWindow);
    }

    #[test]
    fn user_reading_the_log() {
        assert_eq!(decide(Some(LOG), Some(LOG), &[LOG, OTHER]), Decision::Focused);
    }

    #[test]
    fn window_gone() {
        assert_eq!(decide(Some(LOG), Some(OTHER), &[OTHER]), Decision::Hidden);
    }

    #[test]
    fn scrolls_when_visible_and_unfocused() {
        assert_eq!(
            decide(Some(LOG), Some(OTHER), &[OTHER, LOG]),
            Decision::Scroll(LOG)
        );
        assert_eq!(decide(Some(LOG), None, &[LOG]), Decision::Scroll(LOG));
    }
}
