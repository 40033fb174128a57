//! Tracking the log surface across host-side churn.
//!
//! The tracker holds a belief about which buffer and window show the log and
//! checks that belief against the host whenever it matters. Lifecycle events
//! arrive through [`SurfaceTracker::handle_event`]; only events from the one
//! live subscription are acted on.

use tracing::{debug, trace};

use crate::host::{
    BufferId, HostError, SubscriptionId, SurfaceEvent, SurfaceEventKind, SurfaceHandle,
    SurfaceSpec, ViewHost, WindowId,
};

const WATCHED: [SurfaceEventKind; 2] = [SurfaceEventKind::Destroy, SurfaceEventKind::Enter];

/// Belief about the log surface plus the subscription that keeps it honest.
///
/// A window is only ever tracked alongside a buffer. The buffer is what holds
/// the log; the window may be closed by the user and left stale.
#[derive(Debug)]
pub struct SurfaceTracker {
    name: String,
    buffer: Option<BufferId>,
    window: Option<WindowId>,
    subscription: Option<(SubscriptionId, BufferId)>,
}

impl SurfaceTracker {
    /// A tracker for the buffer called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buffer: None,
            window: None,
            subscription: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tracked buffer, without consulting the host.
    pub fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    /// The tracked buffer and window, if both are known. The window may be stale.
    pub fn handle(&self) -> Option<SurfaceHandle> {
        Some(SurfaceHandle {
            buffer: self.buffer?,
            window: self.window?,
        })
    }

    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.subscription.map(|(id, _)| id)
    }

    /// Whether the log buffer exists, re-adopting one found by name.
    ///
    /// A buffer nobody is looking at still counts.
    pub fn exists<H: ViewHost>(&mut self, host: &mut H) -> bool {
        if let Some(buffer) = self.buffer {
            if host.is_buffer_valid(buffer, &self.name) {
                if self.window.is_none() {
                    self.window = host.window_for_buffer(buffer);
                }
                return true;
            }
            debug!(%buffer, "tracked buffer is gone");
            self.forget();
        }

        let Some(buffer) = host.find_buffer(&self.name) else {
            return false;
        };
        self.buffer = Some(buffer);
        self.window = host.window_for_buffer(buffer);
        debug!(%buffer, window = ?self.window, "re-adopted log buffer by name");
        if self.subscription.map(|(_, b)| b) != Some(buffer) {
            self.watch(host, buffer);
        }
        true
    }

    /// Whether the surface is currently shown to the user.
    ///
    /// Any failed check drops both ids.
    pub fn is_open<H: ViewHost>(&mut self, host: &H) -> bool {
        let open = self.handle().is_some_and(|handle| {
            host.is_buffer_valid(handle.buffer, &self.name)
                && host.is_window_valid(handle.window)
                && host.list_windows().contains(&handle.window)
        });
        if !open && self.buffer.is_some() {
            trace!(buffer = ?self.buffer, window = ?self.window, "log surface is not open");
            self.forget();
        }
        open
    }

    /// Make sure the log buffer exists, creating a surface only when it is gone.
    pub fn ensure<H: ViewHost>(
        &mut self,
        host: &mut H,
        spec: &SurfaceSpec,
    ) -> Result<BufferId, HostError> {
        if self.exists(host)
            && let Some(buffer) = self.buffer
        {
            return Ok(buffer);
        }
        Ok(self.create(host, spec)?.buffer)
    }

    /// Show the surface, optionally moving the cursor to the end.
    ///
    /// A hidden log buffer is shown again rather than replaced.
    pub fn open<H: ViewHost>(
        &mut self,
        host: &mut H,
        spec: &SurfaceSpec,
        scroll_to_bottom: bool,
    ) -> Result<(), HostError> {
        if self.is_open(host) {
            return Ok(());
        }
        let handle = self.create(host, spec)?;
        if scroll_to_bottom {
            // The window may already be gone again; that's fine.
            let scrolled = host
                .line_count(handle.buffer)
                .and_then(|count| host.set_cursor(handle.window, count.max(1), 0));
            if let Err(e) = scrolled {
                debug!("scroll to bottom skipped: {e}");
            }
        }
        Ok(())
    }

    /// Close the log window. The buffer, and the ids, are left as they are.
    pub fn close<H: ViewHost>(&mut self, host: &mut H) -> Result<(), HostError> {
        if !self.is_open(host) {
            return Ok(());
        }
        match self.window {
            Some(window) => host.destroy_window(window),
            None => Ok(()),
        }
    }

    pub fn toggle<H: ViewHost>(&mut self, host: &mut H, spec: &SurfaceSpec) -> Result<(), HostError> {
        if self.is_open(host) {
            self.close(host)
        } else {
            self.open(host, spec, true)
        }
    }

    /// React to a lifecycle event delivered by the host.
    pub fn handle_event<H: ViewHost>(&mut self, host: &mut H, event: SurfaceEvent) {
        if self.subscription() != Some(event.subscription) {
            trace!(subscription = ?event.subscription, "ignoring event from retired subscription");
            return;
        }
        match event.kind {
            SurfaceEventKind::Destroy => {
                debug!("log buffer destroyed");
                self.forget();
                if let Some((id, _)) = self.subscription.take() {
                    host.unsubscribe(id);
                }
            }
            SurfaceEventKind::Enter => {
                if let (Some(buffer), Some(window)) = (host.current_buffer(), host.current_window())
                    && host.is_buffer_valid(buffer, &self.name)
                {
                    self.buffer = Some(buffer);
                    self.window = Some(window);
                }
            }
        }
    }

    /// Ask the host for a surface and track it under a fresh subscription.
    fn create<H: ViewHost>(
        &mut self,
        host: &mut H,
        spec: &SurfaceSpec,
    ) -> Result<SurfaceHandle, HostError> {
        let handle = host.create_surface(spec)?;
        debug!(buffer = %handle.buffer, window = %handle.window, "created log surface");
        self.buffer = Some(handle.buffer);
        self.window = Some(handle.window);
        self.watch(host, handle.buffer);
        Ok(handle)
    }

    fn forget(&mut self) {
        self.buffer = None;
        self.window = None;
    }

    /// Retire the current subscription and watch `buffer` instead.
    fn watch<H: ViewHost>(&mut self, host: &mut H, buffer: BufferId) {
        if let Some((old, _)) = self.subscription.take() {
            host.unsubscribe(old);
        }
        let id = host.subscribe(buffer, &WATCHED);
        self.subscription = Some((id, buffer));
    }
}
