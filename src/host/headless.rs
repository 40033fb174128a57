//! In-memory host: buffers and windows that live only inside this process.
//!
//! The binary uses it when no editor is attached, and the tests use it to
//! play the part of a misbehaving editor. Everything the real host can do
//! behind the sink's back (wipe buffers, close windows, move focus) has a
//! method here, and lifecycle events are queued until someone drains them.

use std::collections::{BTreeMap, VecDeque};

use super::{
    BufferId, HostError, SubscriptionId, SurfaceEvent, SurfaceEventKind, SurfaceHandle,
    SurfaceSpec, ViewHost, WindowId,
};

#[derive(Debug)]
struct Buffer {
    name: String,
    filetype: String,
    lines: Vec<String>,
}

#[derive(Debug)]
struct Window {
    buffer: BufferId,
    cursor: (usize, usize),
}

#[derive(Debug)]
struct Subscription {
    buffer: BufferId,
    kinds: Vec<SurfaceEventKind>,
}

/// A host with no UI behind it.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    next_id: u64,
    buffers: BTreeMap<BufferId, Buffer>,
    windows: BTreeMap<WindowId, Window>,
    current: Option<WindowId>,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
    pending: VecDeque<SurfaceEvent>,
    scrollback: Option<usize>,
    fail_create: bool,
    fail_cursor: bool,
    surfaces_created: usize,
    cursor_moves: usize,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host whose buffers keep only their newest `lines` lines.
    pub fn with_scrollback(lines: usize) -> Self {
        Self {
            scrollback: Some(lines),
            ..Self::default()
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    // ── Simulation ──

    /// Make every following `create_surface` call fail.
    pub fn set_fail_create(&mut self, fail: bool) {
        self.fail_create = fail;
    }

    /// Make every following `set_cursor` call fail.
    pub fn set_fail_cursor(&mut self, fail: bool) {
        self.fail_cursor = fail;
    }

    /// Open an unrelated scratch window and focus it.
    pub fn open_scratch(&mut self, name: &str) -> SurfaceHandle {
        let buffer = BufferId(self.next_id());
        self.buffers.insert(
            buffer,
            Buffer {
                name: name.to_string(),
                filetype: String::new(),
                lines: Vec::new(),
            },
        );
        let window = self.open_window(buffer);
        self.focus(window);
        SurfaceHandle { buffer, window }
    }

    /// Move focus to `window`, firing enter events for its buffer.
    pub fn focus(&mut self, window: WindowId) {
        let Some(buffer) = self.windows.get(&window).map(|w| w.buffer) else {
            return;
        };
        self.current = Some(window);
        self.queue(buffer, SurfaceEventKind::Enter);
    }

    /// Wipe a buffer and every window showing it, firing destroy events.
    pub fn wipe_buffer(&mut self, buffer: BufferId) {
        if self.remove_buffer(buffer) {
            self.queue(buffer, SurfaceEventKind::Destroy);
        }
    }

    /// Wipe a buffer without telling anyone.
    pub fn wipe_buffer_silently(&mut self, buffer: BufferId) {
        self.remove_buffer(buffer);
    }

    /// Drain the lifecycle events queued since the last call.
    pub fn take_events(&mut self) -> Vec<SurfaceEvent> {
        self.pending.drain(..).collect()
    }

    // ── Inspection ──

    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    /// Buffers the live subscriptions are bound to.
    pub fn subscribed_buffers(&self) -> Vec<BufferId> {
        self.subscriptions.values().map(|s| s.buffer).collect()
    }

    pub fn surfaces_created(&self) -> usize {
        self.surfaces_created
    }

    /// Number of successful cursor moves so far.
    pub fn cursor_moves(&self) -> usize {
        self.cursor_moves
    }

    pub fn cursor(&self, window: WindowId) -> Option<(usize, usize)> {
        self.windows.get(&window).map(|w| w.cursor)
    }

    pub fn filetype(&self, buffer: BufferId) -> Option<&str> {
        self.buffers.get(&buffer).map(|b| b.filetype.as_str())
    }

    // ── Internals ──

    fn open_window(&mut self, buffer: BufferId) -> WindowId {
        let window = WindowId(self.next_id());
        self.windows.insert(
            window,
            Window {
                buffer,
                cursor: (1, 0),
            },
        );
        window
    }

    fn remove_buffer(&mut self, buffer: BufferId) -> bool {
        if self.buffers.remove(&buffer).is_none() {
            return false;
        }
        let doomed: Vec<WindowId> = self
            .windows
            .iter()
            .filter(|(_, w)| w.buffer == buffer)
            .map(|(id, _)| *id)
            .collect();
        for window in doomed {
            self.remove_window(window);
        }
        true
    }

    fn remove_window(&mut self, window: WindowId) {
        self.windows.remove(&window);
        if self.current == Some(window) {
            self.current = self.windows.keys().next().copied();
        }
    }

    fn queue(&mut self, buffer: BufferId, kind: SurfaceEventKind) {
        let events = self
            .subscriptions
            .iter()
            .filter(|(_, s)| s.buffer == buffer && s.kinds.contains(&kind))
            .map(|(id, _)| SurfaceEvent {
                subscription: *id,
                kind,
            });
        self.pending.extend(events);
    }

    fn buffer(&self, buffer: BufferId) -> Result<&Buffer, HostError> {
        self.buffers
            .get(&buffer)
            .ok_or(HostError::InvalidBuffer(buffer))
    }
}

impl ViewHost for HeadlessHost {
    fn create_surface(&mut self, spec: &SurfaceSpec) -> Result<SurfaceHandle, HostError> {
        if self.fail_create {
            return Err(HostError::CreateFailed(format!(
                "`{}` refused",
                spec.open_command
            )));
        }
        let buffer = match self.find_buffer(&spec.filename) {
            Some(existing) => existing,
            None => {
                let id = BufferId(self.next_id());
                self.buffers.insert(
                    id,
                    Buffer {
                        name: spec.filename.clone(),
                        filetype: spec.filetype.clone(),
                        lines: Vec::new(),
                    },
                );
                id
            }
        };
        let window = self.open_window(buffer);
        if spec.focus_on_open {
            self.current = Some(window);
        }
        self.surfaces_created += 1;
        Ok(SurfaceHandle { buffer, window })
    }

    fn find_buffer(&self, name: &str) -> Option<BufferId> {
        self.buffers
            .iter()
            .find(|(_, b)| b.name == name)
            .map(|(id, _)| *id)
    }

    fn window_for_buffer(&self, buffer: BufferId) -> Option<WindowId> {
        self.windows
            .iter()
            .find(|(_, w)| w.buffer == buffer)
            .map(|(id, _)| *id)
    }

    fn is_buffer_valid(&self, buffer: BufferId, name: &str) -> bool {
        self.buffers.get(&buffer).is_some_and(|b| b.name == name)
    }

    fn is_window_valid(&self, window: WindowId) -> bool {
        self.windows.contains_key(&window)
    }

    fn list_windows(&self) -> Vec<WindowId> {
        self.windows.keys().copied().collect()
    }

    fn current_window(&self) -> Option<WindowId> {
        self.current
    }

    fn current_buffer(&self) -> Option<BufferId> {
        self.current
            .and_then(|w| self.windows.get(&w))
            .map(|w| w.buffer)
    }

    fn set_cursor(&mut self, window: WindowId, line: usize, col: usize) -> Result<(), HostError> {
        let buffer = self
            .windows
            .get(&window)
            .ok_or(HostError::InvalidWindow(window))?
            .buffer;
        let count = self.line_count(buffer)?;
        if self.fail_cursor || line == 0 || line > count.max(1) {
            return Err(HostError::CursorOutOfRange { window, line, col });
        }
        if let Some(w) = self.windows.get_mut(&window) {
            w.cursor = (line, col);
        }
        self.cursor_moves += 1;
        Ok(())
    }

    fn line_count(&self, buffer: BufferId) -> Result<usize, HostError> {
        Ok(self.buffer(buffer)?.lines.len())
    }

    fn get_lines(&self, buffer: BufferId) -> Result<Vec<String>, HostError> {
        Ok(self.buffer(buffer)?.lines.clone())
    }

    fn set_lines(
        &mut self,
        buffer: BufferId,
        start: usize,
        end: usize,
        lines: &[String],
    ) -> Result<(), HostError> {
        let buf = self
            .buffers
            .get_mut(&buffer)
            .ok_or(HostError::InvalidBuffer(buffer))?;
        if start > end || end > buf.lines.len() {
            return Err(HostError::LinesOutOfRange { buffer, start, end });
        }
        buf.lines.splice(start..end, lines.iter().cloned());
        if let Some(max) = self.scrollback
            && buf.lines.len() > max
        {
            let excess = buf.lines.len() - max;
            buf.lines.drain(..excess);
        }
        Ok(())
    }

    fn destroy_window(&mut self, window: WindowId) -> Result<(), HostError> {
        if !self.windows.contains_key(&window) {
            return Err(HostError::InvalidWindow(window));
        }
        self.remove_window(window);
        Ok(())
    }

    fn subscribe(&mut self, buffer: BufferId, kinds: &[SurfaceEventKind]) -> SubscriptionId {
        let id = SubscriptionId(self.next_id());
        self.subscriptions.insert(
            id,
            Subscription {
                buffer,
                kinds: kinds.to_vec(),
            },
        );
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscriptions.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> SurfaceSpec {
        SurfaceSpec {
            filename: "__FLUTTER_DEV_LOG__".into(),
            filetype: "log".into(),
            open_command: "botright 30vnew".into(),
            focus_on_open: false,
        }
    }

    #[test]
    fn create_reuses_buffer_with_same_name() {
        let mut host = HeadlessHost::new();
        let first = host.create_surface(&spec()).unwrap();
        host.destroy_window(first.window).unwrap();

        let second = host.create_surface(&spec()).unwrap();
        assert_eq!(first.buffer, second.buffer);
        assert_ne!(first.window, second.window);
        assert_eq!(host.filetype(second.buffer), Some("log"));
    }

    #[test]
    fn wipe_fires_destroy_only_for_matching_subscriptions() {
        let mut host = HeadlessHost::new();
        let log = host.create_surface(&spec()).unwrap();
        let other = host.open_scratch("scratch");

        let sub = host.subscribe(log.buffer, &[SurfaceEventKind::Destroy]);
        host.subscribe(other.buffer, &[SurfaceEventKind::Destroy]);

        host.wipe_buffer(log.buffer);
        let events = host.take_events();

        assert_eq!(
            events,
            vec![SurfaceEvent {
                subscription: sub,
                kind: SurfaceEventKind::Destroy
            }]
        );
        assert!(!host.is_window_valid(log.window));
        assert!(host.take_events().is_empty());
    }

    #[test]
    fn silent_wipe_queues_nothing() {
        let mut host = HeadlessHost::new();
        let log = host.create_surface(&spec()).unwrap();
        host.subscribe(log.buffer, &[SurfaceEventKind::Destroy]);

        host.wipe_buffer_silently(log.buffer);

        assert!(host.take_events().is_empty());
        assert!(host.find_buffer("__FLUTTER_DEV_LOG__").is_none());
    }

    #[test]
    fn set_lines_rejects_out_of_range() {
        let mut host = HeadlessHost::new();
        let log = host.create_surface(&spec()).unwrap();
        let err = host.set_lines(log.buffer, 1, 2, &[]).unwrap_err();
        assert!(matches!(err, HostError::LinesOutOfRange { .. }));
    }

    #[test]
    fn scrollback_drops_oldest_lines() {
        let mut host = HeadlessHost::with_scrollback(2);
        let log = host.create_surface(&spec()).unwrap();

        for line in ["a", "b", "c"] {
            let end = host.line_count(log.buffer).unwrap();
            host.set_lines(log.buffer, end, end, &[line.to_string()])
                .unwrap();
        }

        assert_eq!(host.get_lines(log.buffer).unwrap(), vec!["b", "c"]);
    }

    #[test]
    fn cursor_must_land_on_a_line() {
        let mut host = HeadlessHost::new();
        let log = host.create_surface(&spec()).unwrap();
        host.set_lines(log.buffer, 0, 0, &["a".into(), "b".into()])
            .unwrap();

        host.set_cursor(log.window, 2, 0).unwrap();
        assert_eq!(host.cursor(log.window), Some((2, 0)));
        assert!(host.set_cursor(log.window, 3, 0).is_err());
        assert_eq!(host.cursor_moves(), 1);
    }
}
