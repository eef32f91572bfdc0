//! Root window property changes as window events
//!
//! A mio thread polls the X11 file descriptor and wakes the async loop,
//! which drains the connection and translates `PropertyNotify` on the root
//! window into desktop switches and background changes.

use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use termchild_proto::WindowEvent;
use tokio::sync::{oneshot, Notify};
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    AtomEnum, ChangeWindowAttributesAux, ConnectionExt, EventMask, PropertyNotifyEvent, Window,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use super::Atoms;

/// Desktop events read from the X server
pub struct DesktopEventStream {
    conn: Arc<RustConnection>,
    root: Window,
    atoms: Atoms,
    notify: Arc<Notify>,
    _task_guard: oneshot::Receiver<()>,
}

impl DesktopEventStream {
    /// Listen to property changes on `root` and start the polling thread
    pub fn new(conn: Arc<RustConnection>, root: Window, atoms: Atoms) -> Result<Self> {
        conn.change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE),
        )?
        .check()
        .context("Failed to select property changes on the root window")?;

        let fd = conn.stream().as_raw_fd();
        let notify = Arc::new(Notify::new());
        let task_notify = notify.clone();

        let (guard, task_guard) = oneshot::channel::<()>();
        let mut poll = mio::Poll::new().context("Failed to create mio Poll")?;
        let mut events = mio::Events::with_capacity(1);

        poll.registry()
            .register(
                &mut mio::unix::SourceFd(&fd),
                mio::Token(0),
                mio::Interest::READABLE,
            )
            .context("Failed to register X11 FD with mio")?;

        let timeout = Duration::from_millis(100);
        tokio::task::spawn_blocking(move || loop {
            if guard.is_closed() {
                info!("X11 socket polling thread shutting down");
                return;
            }

            if let Err(err) = poll.poll(&mut events, Some(timeout)) {
                warn!("X11 socket poll failed: {:?}", err);
                continue;
            }

            events
                .iter()
                .filter(|event| event.token() == mio::Token(0))
                .for_each(|_| task_notify.notify_one());
        });

        Ok(Self {
            conn,
            root,
            atoms,
            notify,
            _task_guard: task_guard,
        })
    }

    /// Next non-empty batch of translated events. Events already queued on
    /// the connection are drained before waiting on the socket.
    pub async fn next_batch(&self) -> Result<Vec<WindowEvent>> {
        loop {
            let mut batch = Vec::new();
            while let Some(event) = self.conn.poll_for_event()? {
                if let Event::PropertyNotify(notify) = event {
                    if let Some(translated) = self.translate(&notify)? {
                        batch.push(translated);
                    }
                }
            }
            if !batch.is_empty() {
                return Ok(batch);
            }

            self.conn.flush()?;
            self.notify.notified().await;
        }
    }

    fn translate(&self, event: &PropertyNotifyEvent) -> Result<Option<WindowEvent>> {
        if event.window != self.root {
            return Ok(None);
        }

        if event.atom == self.atoms.net_current_desktop {
            let desktop = self.current_desktop()?;
            debug!("Desktop {} activated", desktop);
            Ok(Some(WindowEvent::DesktopActivated { desktop }))
        } else if self.atoms.is_root_background(event.atom) {
            // The root pixmap always shows the active desktop
            let desktop = self.current_desktop()?;
            debug!("Root background changed on desktop {}", desktop);
            Ok(Some(WindowEvent::BackgroundChanged { desktop }))
        } else {
            Ok(None)
        }
    }

    fn current_desktop(&self) -> Result<u32> {
        let reply = self
            .conn
            .get_property(
                false,
                self.root,
                self.atoms.net_current_desktop,
                AtomEnum::CARDINAL,
                0,
                1,
            )?
            .reply()?;
        reply
            .value32()
            .and_then(|mut values| values.next())
            .context("Root window has no _NET_CURRENT_DESKTOP")
    }
}
