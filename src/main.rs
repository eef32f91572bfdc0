//! termchild replay host
//!
//! Drives one session window on the headless host from a JSON-lines event
//! script (a file, or stdin) and prints the window's notices as JSON lines
//! on stdout. With `--x11-window`, desktop state and desktop events come
//! from the running X server instead of the replay configuration.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use image::RgbaImage;
use termchild::config::Config;
use termchild::desktop::{Desktop, DesktopId, DesktopPlacement};
use termchild::geometry::PixelSize;
use termchild::headless::{HeadlessSession, HeadlessView, HeadlessWindow, ScriptedDesktop, ScriptedPrompt};
use termchild::host::{HostCapabilities, TerminalView};
use termchild::x11::{Atoms, DesktopEventStream, X11Desktop};
use termchild::{
    ChildId, Collaborators, Lifecycle, SessionWindowController, WindowClosed, WindowOptions,
    WindowParts,
};
use termchild_proto::{decode_event, encode_line, ChildNotice, WindowEvent};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use x11rb::connection::Connection;

type Controller = SessionWindowController<HeadlessView, HeadlessSession, HeadlessWindow>;

const CHILD: ChildId = ChildId(1);

/// Command line options
#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    /// Event script; stdin when absent or `-`
    script: Option<PathBuf>,
    /// Where to write the last painted background as PNG
    background_out: Option<PathBuf>,
    /// Top-level X11 window whose desktop is tracked
    x11_window: Option<u32>,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut parsed = Args::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = || {
            iter.next()
                .with_context(|| format!("{} needs a value", arg))
        };
        match arg.as_str() {
            "--config" | "-c" => parsed.config = Some(PathBuf::from(value()?)),
            "--script" | "-s" => {
                let script = value()?;
                parsed.script = (script != "-").then(|| PathBuf::from(script));
            }
            "--background-out" | "-o" => parsed.background_out = Some(PathBuf::from(value()?)),
            "--x11-window" => parsed.x11_window = Some(parse_window_id(value()?)?),
            other => anyhow::bail!("Unknown argument {:?}", other),
        }
    }
    Ok(parsed)
}

fn parse_window_id(text: &str) -> Result<u32> {
    let parsed = match text.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.with_context(|| format!("Invalid window id {:?}", text))
}

/// Tracks what has been reported so only changes are printed
struct Replay<O: Write> {
    controller: Controller,
    scripted: Option<ScriptedDesktop>,
    closed_rx: UnboundedReceiver<WindowClosed<HeadlessView, HeadlessSession>>,
    out: O,
    title: (String, String),
    background_sets: u32,
    last_background: Option<RgbaImage>,
    keep_background: bool,
}

impl<O: Write> Replay<O> {
    fn apply(&mut self, event: WindowEvent) -> Result<()> {
        if let (Some(scripted), WindowEvent::DesktopActivated { desktop }) = (&self.scripted, &event) {
            scripted.set_current(DesktopId(*desktop));
        }

        debug!("Event: {:?}", event);
        if let Err(e) = self.controller.handle(event) {
            warn!("Event failed: {}", e);
        }
        self.report()
    }

    /// Print notices for whatever changed since the last report
    fn report(&mut self) -> Result<()> {
        let window = self.controller.window();
        let title = (window.caption().to_string(), window.icon_text().to_string());
        if title != self.title && !window.is_closed() {
            self.title = title;
            self.emit(&ChildNotice::TitleChanged {
                caption: self.title.0.clone(),
                icon_text: self.title.1.clone(),
            })?;
        }

        if let Some(view) = self.controller.view() {
            if view.background_sets() != self.background_sets {
                self.background_sets = view.background_sets();
                let size = view.pixel_size();
                let notice = ChildNotice::BackgroundUpdated {
                    kind: view.background().kind(),
                    width: size.width,
                    height: size.height,
                };
                if self.keep_background {
                    self.last_background = Some(view.render_background());
                }
                self.emit(&notice)?;
            }
        }

        while let Ok(closed) = self.closed_rx.try_recv() {
            self.emit(&ChildNotice::WindowClosed {
                child: closed.child.0,
                reusable: closed.reusable.is_some(),
            })?;
        }
        Ok(())
    }

    fn emit(&mut self, notice: &ChildNotice) -> Result<()> {
        self.out.write_all(encode_line(notice)?.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    /// End the session on shutdown, otherwise let the window go and hand
    /// the session back; then report and save the background
    fn finish(mut self, shutdown: bool, background_out: Option<PathBuf>) -> Result<()> {
        if shutdown && self.controller.lifecycle() == Lifecycle::Active {
            if let Err(e) = self.controller.end_session() {
                error!("Failed to end session: {}", e);
            }
        }

        let Replay {
            controller,
            mut closed_rx,
            mut out,
            last_background,
            ..
        } = self;
        drop(controller);

        while let Ok(closed) = closed_rx.try_recv() {
            let notice = ChildNotice::WindowClosed {
                child: closed.child.0,
                reusable: closed.reusable.is_some(),
            };
            out.write_all(encode_line(&notice)?.as_bytes())?;
        }
        out.flush()?;

        if let Some(path) = background_out {
            let background = last_background.context("No background was painted")?;
            background
                .save(&path)
                .with_context(|| format!("Failed to write background to {:?}", path))?;
            info!("Background written to {:?}", path);
        }
        Ok(())
    }
}

fn scripted_desktop(config: &Config) -> Result<ScriptedDesktop> {
    let replay = &config.replay;
    if replay.is_sticky() {
        info!("Window is on all desktops");
    }
    let desktop = ScriptedDesktop::new(
        DesktopPlacement::from_raw(replay.window_desktop),
        DesktopId(replay.current_desktop),
    );
    desktop.set_root_color(replay.root_color);
    if let Some(path) = &replay.root_image {
        let image = image::open(path)
            .with_context(|| format!("Failed to load root image {:?}", path))?;
        desktop.set_root_image(image.to_rgba8());
    }
    Ok(desktop)
}

fn x11_desktop(window: u32, events_tx: UnboundedSender<WindowEvent>) -> Result<X11Desktop> {
    let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
    let conn = Arc::new(conn);
    let root = conn
        .setup()
        .roots
        .get(screen_num)
        .context("X server has no such screen")?
        .root;
    let atoms = Atoms::new(conn.as_ref())?;
    info!("Tracking desktop of window {:#x} on screen {}", window, screen_num);

    let stream = DesktopEventStream::new(Arc::clone(&conn), root, atoms)?;
    tokio::spawn(async move {
        loop {
            match stream.next_batch().await {
                Ok(batch) => {
                    for event in batch {
                        if events_tx.send(event).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    error!("X11 event stream failed: {}", e);
                    return;
                }
            }
        }
    });

    Ok(X11Desktop::new(conn, root, window, atoms))
}

fn spawn_script_reader(script: Option<PathBuf>, events_tx: UnboundedSender<WindowEvent>) {
    tokio::spawn(async move {
        let reader: Box<dyn AsyncRead + Unpin + Send> = match &script {
            Some(path) => match tokio::fs::File::open(path).await {
                Ok(file) => Box::new(file),
                Err(e) => {
                    error!("Failed to open script {:?}: {}", path, e);
                    return;
                }
            },
            None => Box::new(tokio::io::stdin()),
        };

        let mut lines = BufReader::new(reader).lines();
        let mut number = 0;
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read script: {}", e);
                    break;
                }
            };
            number += 1;
            match decode_event(&line) {
                Ok(Some(event)) => {
                    if events_tx.send(event).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Script line {}: {}", number, e),
            }
        }
        debug!("Script finished after {} lines", number);
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (stdout carries the notices)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "termchild=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&args)?;
    let config = Config::load(args.config.as_deref())?;

    info!("Starting termchild replay");

    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<WindowEvent>();
    let (scripted, desktop): (Option<ScriptedDesktop>, Box<dyn Desktop>) = match args.x11_window {
        Some(window) => (
            None,
            Box::new(x11_desktop(window, events_tx.clone())?) as Box<dyn Desktop>,
        ),
        None => {
            let desktop = scripted_desktop(&config)?;
            (Some(desktop.clone()), Box::new(desktop) as Box<dyn Desktop>)
        }
    };
    spawn_script_reader(args.script.clone(), events_tx);

    let mut session = HeadlessSession::new(&config.replay.title);
    if let Some(pid) = config.replay.session_pid {
        session = session.with_pid(pid);
    }
    let (closed_tx, closed_rx) = mpsc::unbounded_channel();
    let mut controller = Controller::initialize(
        CHILD,
        WindowParts {
            view: HeadlessView::new(PixelSize::new(config.host.cell_width, config.host.cell_height)),
            session,
            window: HeadlessWindow::new(PixelSize::default()),
        },
        Collaborators {
            desktop,
            prompt: Box::new(ScriptedPrompt::new(
                config.replay.rename_answers.iter().cloned().map(Some),
            )),
            caps: HostCapabilities {
                true_alpha: config.host.true_alpha,
            },
        },
        &WindowOptions::from_config(&config),
        Arc::new(config.schema.clone()),
        closed_tx,
    );
    controller.run()?;

    let mut replay = Replay {
        controller,
        scripted,
        closed_rx,
        out: std::io::stdout(),
        title: Default::default(),
        background_sets: 0,
        last_background: None,
        keep_background: args.background_out.is_some(),
    };
    replay.report()?;

    // Handle SIGTERM and SIGINT
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, ending session"),
                _ = sigint.recv() => info!("Received SIGINT, ending session"),
            }
            let _ = shutdown_tx.send(()).await;
        });
    }

    let mut shutdown = false;
    while replay.controller.lifecycle() == Lifecycle::Active {
        tokio::select! {
            event = events_rx.recv() => match event {
                Some(event) => replay.apply(event)?,
                None => {
                    info!("No more events, detaching window");
                    break;
                }
            },
            _ = shutdown_rx.recv() => {
                shutdown = true;
                break;
            }
        }
    }

    replay.finish(shutdown, args.background_out)
}
