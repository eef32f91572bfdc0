use anyhow::Result;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, ConnectionExt};

/// Interned atoms for desktop and root background properties
#[derive(Debug, Clone, Copy)]
pub struct Atoms {
    pub net_current_desktop: Atom,
    pub net_wm_desktop: Atom,
    /// Root background pixmap as published by most wallpaper setters
    pub xrootpmap_id: Atom,
    pub esetroot_pmap_id: Atom,
}

impl Atoms {
    /// Intern all required atoms
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        let intern = |name: &str| -> Result<Atom> {
            Ok(conn.intern_atom(false, name.as_bytes())?.reply()?.atom)
        };

        Ok(Self {
            net_current_desktop: intern("_NET_CURRENT_DESKTOP")?,
            net_wm_desktop: intern("_NET_WM_DESKTOP")?,
            xrootpmap_id: intern("_XROOTPMAP_ID")?,
            esetroot_pmap_id: intern("ESETROOT_PMAP_ID")?,
        })
    }

    pub fn is_root_background(&self, atom: Atom) -> bool {
        atom == self.xrootpmap_id || atom == self.esetroot_pmap_id
    }
}
