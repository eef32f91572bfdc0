use std::path::PathBuf;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use nix::sys::signal::Signal;
use pretty_assertions::assert_eq;
use termchild_proto::{MenuAction, SignalKind, WindowEvent};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};

use super::*;
use crate::config::{MenuConfig, ViewOptions};
use crate::desktop::{DesktopPlacement, WallpaperState};
use crate::headless::{HeadlessSession, HeadlessView, HeadlessWindow, ScriptedDesktop, ScriptedPrompt};
use crate::schema::{Alignment, Rgb, Transparency};

type TestController = SessionWindowController<HeadlessView, HeadlessSession, HeadlessWindow>;
type Closed = WindowClosed<HeadlessView, HeadlessSession>;

const CELL: PixelSize = PixelSize {
    width: 8,
    height: 16,
};
const DECORATION: PixelSize = PixelSize {
    width: 4,
    height: 30,
};
const WHITE: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 0xff]);
const RED: Rgba<u8> = Rgba([0xff, 0, 0, 0xff]);

struct Harness {
    controller: TestController,
    desktop: ScriptedDesktop,
    closed_rx: UnboundedReceiver<Closed>,
}

struct Setup {
    options: WindowOptions,
    schema: Schema,
    caps: HostCapabilities,
    answers: Vec<Option<String>>,
    window_desktop: DesktopPlacement,
    current_desktop: u32,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            options: WindowOptions {
                columns: 0,
                lines: 0,
                fixed_size: false,
                allow_resize_from_session: true,
                view: ViewOptions::default(),
                menu: MenuConfig::default(),
            },
            schema: Schema::default(),
            caps: HostCapabilities::default(),
            answers: Vec::new(),
            window_desktop: DesktopPlacement::Desktop(DesktopId(0)),
            current_desktop: 0,
        }
    }
}

impl Setup {
    fn build(self) -> Harness {
        let desktop = ScriptedDesktop::new(self.window_desktop, DesktopId(self.current_desktop));
        desktop.set_root_color(Rgb(100, 100, 100));
        let (closed_tx, closed_rx) = mpsc::unbounded_channel();

        let controller = SessionWindowController::initialize(
            ChildId(1),
            WindowParts {
                view: HeadlessView::new(CELL),
                session: HeadlessSession::new("Shell"),
                window: HeadlessWindow::new(DECORATION),
            },
            Collaborators {
                desktop: Box::new(desktop.clone()),
                prompt: Box::new(ScriptedPrompt::new(self.answers)),
                caps: self.caps,
            },
            &self.options,
            Arc::new(self.schema),
            closed_tx,
        );

        Harness {
            controller,
            desktop,
            closed_rx,
        }
    }
}

impl Harness {
    fn view(&self) -> &HeadlessView {
        self.controller.view().expect("view is linked")
    }

    fn closed(&mut self) -> Vec<Closed> {
        let mut notices = Vec::new();
        loop {
            match self.closed_rx.try_recv() {
                Ok(closed) => notices.push(closed),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return notices,
            }
        }
    }
}

fn write_red_square(dir: &std::path::Path, side: u32) -> PathBuf {
    let path = dir.join("square.png");
    RgbaImage::from_pixel(side, side, RED).save(&path).unwrap();
    path
}

fn transparent_schema(fade: f32) -> Schema {
    Schema {
        use_transparency: true,
        transparency: Transparency {
            fade,
            tint: Rgb(0, 0, 0),
        },
        ..Schema::default()
    }
}

fn fitted(background: &Background) -> Arc<RgbaImage> {
    match background {
        Background::Fitted(image) => Arc::clone(image),
        other => panic!("expected fitted background, got {:?}", other),
    }
}

// ============================================================================
// Construction and geometry
// ============================================================================

#[test]
fn initialize_configures_view_and_window() {
    let harness = Setup::default().build();
    let view = harness.view();

    assert_eq!(view.options(), Some(&ViewOptions::default()));
    assert_eq!(view.minimum_size(), MINIMUM_VIEW_SIZE);
    assert!(!view.shows_size_at_startup());
    assert!(view.is_focused());
    assert_eq!(view.color_table_sets(), 1);
    assert_eq!(harness.controller.window().caption(), "Shell");
    assert_eq!(harness.controller.window().icon_text(), "Shell");
    assert_eq!(harness.controller.listeners(), Listeners::all());
    assert!(harness.controller.menu().is_some());
    assert_eq!(harness.controller.lifecycle(), Lifecycle::Active);
}

#[test]
fn zero_geometry_falls_back_to_80x24() {
    for (columns, lines) in [(0, 40), (132, 0), (0, 0)] {
        let mut setup = Setup::default();
        setup.options.columns = columns;
        setup.options.lines = lines;
        let mut harness = setup.build();
        assert_eq!(harness.view().term_size(), TermSize::new(80, 24));

        harness.controller.set_geometry(100, 30);
        harness.controller.set_geometry(columns, lines);
        assert_eq!(harness.view().term_size(), TermSize::new(80, 24));
    }
}

#[test]
fn fixed_size_window_depends_only_on_request() {
    let mut setup = Setup::default();
    setup.options.fixed_size = true;
    let mut harness = setup.build();

    harness.controller.set_geometry(100, 30);
    let first = harness.controller.window().size();
    harness.controller.set_geometry(100, 30);
    let second = harness.controller.window().size();

    assert_eq!(first, second);
    assert_eq!(first, PixelSize::new(100 * 8 + 4, 30 * 16 + 30));
    assert_eq!(harness.controller.window().fixed_size(), Some(first));
    assert!(harness.view().is_fixed());
}

#[test]
fn free_window_adjusts_around_view() {
    let mut harness = Setup::default().build();
    harness.controller.set_geometry(40, 10);

    assert!(!harness.view().is_fixed());
    assert_eq!(harness.controller.window().fixed_size(), None);
    assert_eq!(
        harness.controller.window().size(),
        PixelSize::new(40 * 8 + 4, 10 * 16 + 30)
    );
}

#[test]
fn session_column_change_respects_policy() {
    let mut harness = Setup::default().build();
    harness.controller.set_geometry(80, 30);

    harness
        .controller
        .handle(WindowEvent::ColumnsChanged { columns: 132 })
        .unwrap();
    assert_eq!(harness.view().term_size(), TermSize::new(132, 30));
    assert_eq!(harness.view().updates(), 1);

    let mut setup = Setup::default();
    setup.options.allow_resize_from_session = false;
    let mut harness = setup.build();
    harness
        .controller
        .handle(WindowEvent::ColumnsChanged { columns: 132 })
        .unwrap();
    assert_eq!(harness.view().term_size(), TermSize::new(80, 24));
    assert_eq!(harness.view().updates(), 0);
}

// ============================================================================
// Static backgrounds
// ============================================================================

#[test]
fn centered_image_on_dragged_view() {
    let dir = tempfile::tempdir().unwrap();
    let mut setup = Setup::default();
    setup.schema.alignment = Alignment::Center;
    setup.schema.image_path = write_red_square(dir.path(), 50);
    let mut harness = setup.build();

    harness
        .controller
        .view_mut()
        .unwrap()
        .drag_to(PixelSize::new(200, 100));
    harness
        .controller
        .handle(WindowEvent::ImageSizeChanged {
            lines: 6,
            columns: 25,
        })
        .unwrap();

    let canvas = fitted(harness.view().background());
    assert_eq!((canvas.width(), canvas.height()), (200, 100));
    assert_eq!(*canvas.get_pixel(75, 25), RED);
    assert_eq!(*canvas.get_pixel(124, 74), RED);
    assert_eq!(*canvas.get_pixel(74, 25), WHITE);
    assert_eq!(*canvas.get_pixel(125, 74), WHITE);
}

#[test]
fn size_notify_recomposes_only_size_dependent_placements() {
    let dir = tempfile::tempdir().unwrap();
    let mut setup = Setup::default();
    setup.schema.alignment = Alignment::Scale;
    setup.schema.image_path = write_red_square(dir.path(), 10);
    let mut harness = setup.build();

    let before = harness.view().background_sets();
    harness.controller.on_image_size_notify();
    harness.controller.on_image_size_notify();
    assert_eq!(harness.view().background_sets(), before + 2);
    let image = fitted(harness.view().background());
    assert_eq!((image.width(), image.height()), (640, 384));

    let mut setup = Setup::default();
    setup.schema.alignment = Alignment::Tile;
    setup.schema.image_path = write_red_square(dir.path(), 10);
    let mut harness = setup.build();

    let before = harness.view().background_sets();
    harness.controller.on_image_size_notify();
    harness.controller.set_geometry(90, 30);
    assert_eq!(harness.view().background_sets(), before);
    assert!(matches!(harness.view().background(), Background::Tiled(_)));
}

#[test]
fn missing_image_paints_default_color() {
    let dir = tempfile::tempdir().unwrap();
    let mut setup = Setup::default();
    setup.schema.alignment = Alignment::Scale;
    setup.schema.image_path = dir.path().join("gone.png");
    let harness = setup.build();

    assert_eq!(
        harness.view().background(),
        &Background::Color(Rgb(0xff, 0xff, 0xff))
    );
}

// ============================================================================
// Transparency
// ============================================================================

#[test]
fn transparency_without_true_alpha_mirrors_root() {
    let dir = tempfile::tempdir().unwrap();
    let mut harness = Setup::default().build();

    harness
        .controller
        .set_schema(Arc::new(transparent_schema(0.5)));
    let mirror = harness.controller.mirror().expect("mirror started");
    assert!(mirror.is_running());
    assert_eq!(mirror.repaints(), 1);
    let picture = fitted(harness.view().background());
    assert_eq!(*picture.get_pixel(0, 0), Rgba([50, 50, 50, 0xff]));

    let opaque = Schema {
        alignment: Alignment::Tile,
        image_path: write_red_square(dir.path(), 4),
        ..Schema::default()
    };
    harness.controller.set_schema(Arc::new(opaque));
    assert!(harness.controller.mirror().is_none());
    assert!(matches!(harness.view().background(), Background::Tiled(_)));
    assert_eq!(harness.view().blend_color(), Rgba([0, 0, 0, 0xff]));
}

#[test]
fn transparency_with_true_alpha_blends() {
    let setup = Setup {
        caps: HostCapabilities { true_alpha: true },
        schema: Schema {
            transparency: Transparency {
                fade: 0.25,
                tint: Rgb(1, 2, 3),
            },
            use_transparency: true,
            ..Schema::default()
        },
        ..Setup::default()
    };
    let harness = setup.build();

    assert!(harness.controller.mirror().is_none());
    assert_eq!(harness.view().background(), &Background::Cleared);
    assert_eq!(harness.view().blend_color(), Rgba([1, 2, 3, 63]));
    assert_eq!(harness.desktop.snapshots(), 0);
}

#[test]
fn restarting_mirror_replaces_previous_instance() {
    let mut harness = Setup::default().build();

    harness
        .controller
        .set_schema(Arc::new(transparent_schema(0.5)));
    harness
        .controller
        .set_schema(Arc::new(transparent_schema(1.0)));

    let mirror = harness.controller.mirror().unwrap();
    assert_eq!(mirror.repaints(), 1);
    assert_eq!(harness.desktop.snapshots(), 2);
    let picture = fitted(harness.view().background());
    assert_eq!(*picture.get_pixel(0, 0), Rgba([0, 0, 0, 0xff]));
    assert_eq!(harness.view().color_table_sets(), 3);

    let previous = harness
        .controller
        .start_mirror(transparent_schema(0.0).transparency)
        .expect("a mirror was live");
    assert!(!previous.is_running());
    assert_eq!(previous.repaints(), 1);

    let mirror = harness.controller.mirror().unwrap();
    assert!(mirror.is_running());
    assert_eq!(mirror.repaints(), 1);
    assert_eq!(harness.desktop.snapshots(), 3);
}

#[test]
fn hidden_background_change_repaints_once_on_activation() {
    let setup = Setup {
        schema: transparent_schema(0.0),
        window_desktop: DesktopPlacement::Desktop(DesktopId(1)),
        current_desktop: 0,
        ..Setup::default()
    };
    let mut harness = setup.build();
    assert_eq!(harness.desktop.snapshots(), 1);

    harness
        .controller
        .handle(WindowEvent::BackgroundChanged { desktop: 1 })
        .unwrap();
    assert_eq!(harness.controller.wallpaper_state(), WallpaperState::Stale);
    assert_eq!(harness.desktop.snapshots(), 1);

    harness.desktop.set_current(DesktopId(1));
    harness.desktop.set_root_color(Rgb(7, 8, 9));
    for _ in 0..2 {
        harness
            .controller
            .handle(WindowEvent::DesktopActivated { desktop: 1 })
            .unwrap();
    }
    assert_eq!(
        harness.controller.wallpaper_state(),
        WallpaperState::Fresh(DesktopId(1))
    );
    assert_eq!(harness.desktop.snapshots(), 2);
    let picture = fitted(harness.view().background());
    assert_eq!(*picture.get_pixel(3, 3), Rgba([7, 8, 9, 0xff]));
}

#[test]
fn mirror_restarted_on_hidden_desktop_repaints_on_return() {
    let setup = Setup {
        schema: transparent_schema(0.0),
        window_desktop: DesktopPlacement::Desktop(DesktopId(1)),
        current_desktop: 1,
        ..Setup::default()
    };
    let mut harness = setup.build();
    harness
        .controller
        .handle(WindowEvent::BackgroundChanged { desktop: 1 })
        .unwrap();
    assert_eq!(
        harness.controller.wallpaper_state(),
        WallpaperState::Fresh(DesktopId(1))
    );

    harness.desktop.set_current(DesktopId(0));
    harness.desktop.set_root_color(Rgb(200, 0, 0));
    harness
        .controller
        .handle(WindowEvent::DesktopActivated { desktop: 0 })
        .unwrap();

    // Schema switched away and back while desktop 0 is showing
    harness.controller.set_schema(Arc::new(Schema::default()));
    assert_eq!(harness.controller.wallpaper_state(), WallpaperState::Stale);
    harness
        .controller
        .set_schema(Arc::new(transparent_schema(0.0)));
    assert_eq!(harness.controller.wallpaper_state(), WallpaperState::Stale);
    let picture = fitted(harness.view().background());
    assert_eq!(*picture.get_pixel(0, 0), Rgba([200, 0, 0, 0xff]));

    harness.desktop.set_current(DesktopId(1));
    harness.desktop.set_root_color(Rgb(1, 1, 1));
    harness
        .controller
        .handle(WindowEvent::DesktopActivated { desktop: 1 })
        .unwrap();

    let picture = fitted(harness.view().background());
    assert_eq!(*picture.get_pixel(0, 0), Rgba([1, 1, 1, 0xff]));
    assert_eq!(
        harness.controller.wallpaper_state(),
        WallpaperState::Fresh(DesktopId(1))
    );
}

#[test]
fn mirror_started_on_visible_desktop_is_fresh() {
    let setup = Setup {
        schema: transparent_schema(0.0),
        window_desktop: DesktopPlacement::Desktop(DesktopId(2)),
        current_desktop: 2,
        ..Setup::default()
    };
    let mut harness = setup.build();
    assert_eq!(
        harness.controller.wallpaper_state(),
        WallpaperState::Fresh(DesktopId(2))
    );

    harness
        .controller
        .handle(WindowEvent::DesktopActivated { desktop: 2 })
        .unwrap();
    assert_eq!(harness.desktop.snapshots(), 1);
}

#[test]
fn visible_background_change_repaints_now() {
    let setup = Setup {
        schema: transparent_schema(0.0),
        window_desktop: DesktopPlacement::Desktop(DesktopId(2)),
        current_desktop: 2,
        ..Setup::default()
    };
    let mut harness = setup.build();

    harness
        .controller
        .handle(WindowEvent::BackgroundChanged { desktop: 0 })
        .unwrap();
    assert_eq!(harness.desktop.snapshots(), 1);

    harness
        .controller
        .handle(WindowEvent::BackgroundChanged { desktop: 2 })
        .unwrap();
    assert_eq!(harness.desktop.snapshots(), 2);
}

#[test]
fn desktop_events_without_mirror_do_nothing() {
    let setup = Setup {
        window_desktop: DesktopPlacement::AllDesktops,
        ..Setup::default()
    };
    let mut harness = setup.build();

    harness
        .controller
        .handle(WindowEvent::DesktopActivated { desktop: 0 })
        .unwrap();
    harness
        .controller
        .handle(WindowEvent::BackgroundChanged { desktop: 0 })
        .unwrap();
    assert_eq!(harness.desktop.snapshots(), 0);
    assert_eq!(harness.controller.wallpaper_state(), WallpaperState::Stale);
}

#[test]
fn moving_window_refreshes_mirror() {
    let mut harness = Setup {
        schema: transparent_schema(0.0),
        ..Setup::default()
    }
    .build();
    let mut root = RgbaImage::new(2000, 2000);
    root.put_pixel(300, 200, RED);
    harness.desktop.set_root_image(root);

    harness.controller.view_mut().unwrap().move_to(300, 200);
    harness
        .controller
        .handle(WindowEvent::WindowMoved { x: 300, y: 200 })
        .unwrap();

    let picture = fitted(harness.view().background());
    assert_eq!(*picture.get_pixel(0, 0), RED);
}

#[test]
fn resizing_refreshes_mirror_for_any_alignment() {
    for alignment in [Alignment::None, Alignment::Tile] {
        let mut harness = Setup {
            schema: Schema {
                alignment,
                ..transparent_schema(0.0)
            },
            ..Setup::default()
        }
        .build();
        assert_eq!(harness.desktop.snapshots(), 1);

        harness.controller.set_geometry(100, 30);
        assert_eq!(harness.desktop.snapshots(), 2);
        let picture = fitted(harness.view().background());
        assert_eq!((picture.width(), picture.height()), (800, 480));

        harness.controller.on_image_size_notify();
        assert_eq!(harness.desktop.snapshots(), 3);
        assert_eq!(harness.controller.mirror().unwrap().repaints(), 3);
    }
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn end_session_destroys_everything_once() {
    let mut harness = Setup::default().build();

    harness.controller.handle(WindowEvent::SessionDone).unwrap();
    assert_eq!(harness.controller.lifecycle(), Lifecycle::Terminated);
    assert!(harness.controller.view().is_none());
    assert!(harness.controller.session().is_none());
    assert!(harness.controller.window().is_closed());
    assert_eq!(harness.controller.listeners(), Listeners::empty());

    assert!(matches!(
        harness.controller.end_session(),
        Err(WindowError::AlreadyClosed {
            state: Lifecycle::Terminated
        })
    ));
    assert!(matches!(
        harness.controller.detach_for_reuse(),
        Err(WindowError::AlreadyClosed { .. })
    ));

    let notices = harness.closed();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].child, ChildId(1));
    assert!(notices[0].reusable.is_none());
}

#[test]
fn detach_hands_view_and_session_back() {
    let mut harness = Setup::default().build();
    harness.controller.run().unwrap();
    assert!(harness.controller.session().unwrap().is_connected());

    harness
        .controller
        .handle(WindowEvent::Menu {
            action: MenuAction::AttachSession,
        })
        .unwrap();
    assert_eq!(harness.controller.lifecycle(), Lifecycle::Detached);
    assert!(harness.controller.window().is_closed());

    // Late session events find no listener
    harness.controller.handle(WindowEvent::SessionDone).unwrap();

    let mut notices = harness.closed();
    assert_eq!(notices.len(), 1);
    let reused = notices.pop().unwrap().reusable.expect("view and session handed back");
    assert_eq!(reused.session.title(), "Shell");
    assert!(!reused.session.is_connected());
    assert_eq!(reused.view.term_size(), TermSize::new(80, 24));
}

#[test]
fn dropping_active_window_detaches() {
    let Harness {
        controller,
        mut closed_rx,
        ..
    } = Setup::default().build();
    drop(controller);

    let closed = closed_rx.try_recv().unwrap();
    assert!(closed.reusable.is_some());
    assert!(matches!(closed_rx.try_recv(), Err(TryRecvError::Disconnected)));
}

#[test]
fn dropping_closed_window_sends_nothing_more() {
    let Harness {
        mut controller,
        mut closed_rx,
        ..
    } = Setup::default().build();
    controller.end_session().unwrap();
    drop(controller);

    assert!(closed_rx.try_recv().unwrap().reusable.is_none());
    assert!(matches!(closed_rx.try_recv(), Err(TryRecvError::Disconnected)));
}

#[test]
fn teardown_stops_mirror() {
    let mut harness = Setup {
        schema: transparent_schema(0.5),
        ..Setup::default()
    }
    .build();
    assert!(harness.controller.mirror().is_some());

    harness.controller.end_session().unwrap();
    assert!(harness.controller.mirror().is_none());
}

// ============================================================================
// Session actions
// ============================================================================

#[test]
fn signals_are_forwarded_while_linked() {
    let mut harness = Setup::default().build();

    harness
        .controller
        .handle(WindowEvent::Menu {
            action: MenuAction::SendSignal {
                signal: SignalKind::Usr1,
            },
        })
        .unwrap();
    harness.controller.send_signal(SignalKind::Stop).unwrap();
    assert_eq!(
        harness.controller.session().unwrap().signals(),
        &[Signal::SIGUSR1, Signal::SIGSTOP]
    );

    harness.controller.end_session().unwrap();
    assert!(matches!(
        harness.controller.send_signal(SignalKind::Kill),
        Err(WindowError::StaleSession {
            state: Lifecycle::Terminated
        })
    ));
}

#[test]
fn rename_sets_title_unless_cancelled() {
    let mut harness = Setup {
        answers: vec![Some("build".to_string()), None],
        ..Setup::default()
    }
    .build();

    harness.controller.rename_session().unwrap();
    assert_eq!(harness.controller.window().caption(), "build");
    assert_eq!(harness.controller.window().icon_text(), "build");

    harness
        .controller
        .handle(WindowEvent::Menu {
            action: MenuAction::RenameSession,
        })
        .unwrap();
    assert_eq!(harness.controller.session().unwrap().title(), "build");
}

#[test]
fn title_events_recompose_caption() {
    let mut harness = Setup::default().build();

    harness
        .controller
        .session_mut()
        .unwrap()
        .set_program_title("top");
    harness
        .controller
        .handle(WindowEvent::SessionTitleChanged)
        .unwrap();
    assert_eq!(harness.controller.window().caption(), "Shell - top");

    harness.controller.session_mut().unwrap().set_title("Monitor");
    harness
        .controller
        .handle(WindowEvent::SessionRenamed {
            title: "Monitor".to_string(),
        })
        .unwrap();
    assert_eq!(harness.controller.window().caption(), "Monitor - top");
    assert_eq!(harness.controller.window().icon_text(), "Monitor");
}

#[test]
fn close_action_asks_session_to_end() {
    let mut harness = Setup::default().build();

    harness
        .controller
        .handle(WindowEvent::Menu {
            action: MenuAction::CloseSession,
        })
        .unwrap();
    assert!(harness.controller.session().unwrap().close_requested());
    assert_eq!(harness.controller.lifecycle(), Lifecycle::Active);
    assert!(harness.closed().is_empty());
}

#[test]
fn master_mode_makes_session_listen_to_keys() {
    let mut harness = Setup::default().build();
    harness
        .controller
        .handle(WindowEvent::MasterModeEnabled)
        .unwrap();
    assert!(harness.controller.session().unwrap().listens_to_key_press());
}

// ============================================================================
// Context menu
// ============================================================================

#[test]
fn right_click_shows_menu_at_global_position() {
    let mut harness = Setup::default().build();
    harness.controller.view_mut().unwrap().move_to(100, 50);

    harness
        .controller
        .handle(WindowEvent::ConfigureRequest { x: 10, y: 20 })
        .unwrap();
    assert_eq!(harness.controller.window().menus_shown(), &[(110, 70)]);

    for action in [MenuAction::SelectionEnd, MenuAction::Copy, MenuAction::Paste] {
        harness.controller.handle(WindowEvent::Menu { action }).unwrap();
    }
    let clipboard = harness.view().clipboard();
    assert_eq!(
        (clipboard.selection_ends, clipboard.copies, clipboard.pastes),
        (1, 1, 1)
    );
}

#[test]
fn unauthorized_menu_ignores_actions() {
    let mut setup = Setup::default();
    setup.options.menu = MenuConfig {
        enabled: false,
        ..MenuConfig::default()
    };
    let mut harness = setup.build();

    harness
        .controller
        .handle(WindowEvent::ConfigureRequest { x: 1, y: 1 })
        .unwrap();
    harness
        .controller
        .handle(WindowEvent::Menu {
            action: MenuAction::AttachSession,
        })
        .unwrap();

    assert!(harness.controller.window().menus_shown().is_empty());
    assert_eq!(harness.controller.lifecycle(), Lifecycle::Active);
}

#[test]
fn withheld_signal_menu_blocks_signal_actions() {
    let mut setup = Setup::default();
    setup.options.menu.send_signal = false;
    let mut harness = setup.build();

    harness
        .controller
        .handle(WindowEvent::Menu {
            action: MenuAction::SendSignal {
                signal: SignalKind::Kill,
            },
        })
        .unwrap();
    assert!(harness.controller.session().unwrap().signals().is_empty());
}
