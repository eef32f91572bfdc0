//! Context menu
//!
//! The right-button menu of a session window. Only the model lives here;
//! rendering is the host's job.

use termchild_proto::{MenuAction, SignalKind};

use crate::config::MenuConfig;

/// One menu entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    Action {
        label: String,
        icon: Option<&'static str>,
        action: MenuAction,
    },
    Submenu {
        label: String,
        entries: Vec<MenuEntry>,
    },
    Separator,
    TearOff,
}

impl MenuEntry {
    fn action(label: &str, icon: Option<&'static str>, action: MenuAction) -> Self {
        MenuEntry::Action {
            label: label.to_string(),
            icon,
            action,
        }
    }
}

/// Right-button menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMenu {
    pub entries: Vec<MenuEntry>,
}

impl ContextMenu {
    /// Build the menu, or `None` if the menu is not authorized
    pub fn build(config: &MenuConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        let mut entries = vec![
            MenuEntry::action("Set Selection End", None, MenuAction::SelectionEnd),
            MenuEntry::action("&Copy", Some("editcopy"), MenuAction::Copy),
            MenuEntry::action("&Paste", Some("editpaste"), MenuAction::Paste),
        ];

        if config.send_signal {
            entries.push(MenuEntry::Submenu {
                label: "&Send Signal".to_string(),
                entries: SignalKind::ALL
                    .iter()
                    .map(|&signal| {
                        let label = format!("{} ({})", signal_label(signal), signal.name());
                        MenuEntry::Action {
                            label,
                            icon: None,
                            action: MenuAction::SendSignal { signal },
                        }
                    })
                    .collect(),
            });
        }

        entries.extend([
            MenuEntry::Separator,
            MenuEntry::action("&Attach Session", None, MenuAction::AttachSession),
            MenuEntry::action("&Rename Session...", None, MenuAction::RenameSession),
            MenuEntry::Separator,
            MenuEntry::action("C&lose Session", Some("fileclose"), MenuAction::CloseSession),
        ]);

        if config.tear_off {
            entries.push(MenuEntry::TearOff);
        }

        Some(Self { entries })
    }

    /// All actions reachable from the menu, submenus included
    pub fn actions(&self) -> Vec<MenuAction> {
        fn collect(entries: &[MenuEntry], out: &mut Vec<MenuAction>) {
            for entry in entries {
                match entry {
                    MenuEntry::Action { action, .. } => out.push(*action),
                    MenuEntry::Submenu { entries, .. } => collect(entries, out),
                    MenuEntry::Separator | MenuEntry::TearOff => {}
                }
            }
        }

        let mut actions = Vec::new();
        collect(&self.entries, &mut actions);
        actions
    }

    pub fn offers(&self, action: MenuAction) -> bool {
        self.actions().contains(&action)
    }
}

fn signal_label(signal: SignalKind) -> &'static str {
    match signal {
        SignalKind::Stop => "&Suspend Task",
        SignalKind::Cont => "&Continue Task",
        SignalKind::Hup => "&Hangup",
        SignalKind::Int => "&Interrupt Task",
        SignalKind::Term => "&Terminate Task",
        SignalKind::Kill => "&Kill Task",
        SignalKind::Usr1 => "User Signal &1",
        SignalKind::Usr2 => "User Signal &2",
    }
}
