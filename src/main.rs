#![forbid(unsafe_code)]

mod config;
mod report;
mod scene;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::Instant;

use clap::Parser;
use glint_grid::NoNonSolid;
use glint_lighting::{EngineMode, LightFrame, create_engine, propagate};

use crate::config::{Settings, load_settings_from_path};
use crate::report::{ascii_lightmap, light_stats};
use crate::scene::generate_scene;

/// Headless lightmap driver: generates a cave scene and propagates its light.
#[derive(Debug, Parser)]
#[command(name = "glint", version)]
struct Args {
    /// TOML settings file with [engine] and [scene] tables.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// flood1x, flood2x, flood4x or radiance_cascades (rc).
    #[arg(long)]
    mode: Option<EngineMode>,
    #[arg(long, default_value_t = 3)]
    frames: usize,
    /// Worker threads; 0 picks one per core.
    #[arg(long)]
    threads: Option<usize>,
    #[arg(long)]
    width: Option<usize>,
    #[arg(long)]
    height: Option<usize>,
    #[arg(long)]
    seed: Option<i32>,
    /// Print the final lightmap as ASCII luminance.
    #[arg(long)]
    ascii: bool,
    /// Re-run whenever the settings file changes.
    #[arg(long)]
    watch: bool,
}

impl Args {
    fn settings(&self) -> Result<Settings, String> {
        let mut s = match &self.settings {
            Some(path) => load_settings_from_path(path)?,
            None => Settings::default(),
        };
        if let Some(mode) = self.mode {
            s.engine.mode = mode;
        }
        if let Some(threads) = self.threads {
            s.engine.params.thread_count = threads;
        }
        if let Some(width) = self.width {
            s.scene.width = width;
        }
        if let Some(height) = self.height {
            s.scene.height = height;
        }
        if let Some(seed) = self.seed {
            s.scene.seed = seed;
        }
        Ok(s)
    }
}

fn run_frames(args: &Args, settings: &Settings) {
    let scene = generate_scene(&settings.scene);
    let mode = settings.engine.mode;
    let mut engine = create_engine(mode);
    let frame = LightFrame::new(scene.area, &scene.media, &NoNonSolid);

    let mut lights = scene.lights.clone();
    for i in 0..args.frames {
        let start = Instant::now();
        lights = propagate(engine.as_mut(), &frame, &scene.lights, &settings.engine.params);
        let ms = start.elapsed().as_secs_f64() * 1000.0;
        let top = light_stats(&lights, scene.area);
        match engine.temporal_work() {
            Some(work) => log::info!(
                target: "frame",
                "[frame {}] {} {:.2} ms work={} brightest {:.3} at {:?}",
                i,
                mode,
                ms,
                work,
                top.brightest.max_channel(),
                top.brightest_at
            ),
            None => log::info!(
                target: "frame",
                "[frame {}] {} {:.2} ms brightest {:.3} at {:?}",
                i,
                mode,
                ms,
                top.brightest.max_channel(),
                top.brightest_at
            ),
        }
    }

    let stats = light_stats(&lights, scene.area);
    log::info!(
        "{}x{} lit={} mean={:.4} brightest=({:.3}, {:.3}, {:.3}) at {:?}",
        scene.area.width,
        scene.area.height,
        stats.lit_tiles,
        stats.mean_luminance,
        stats.brightest.r,
        stats.brightest.g,
        stats.brightest.b,
        stats.brightest_at
    );
    if args.ascii {
        print!("{}", ascii_lightmap(&lights, scene.area));
    }
}

/// Spawns a watcher thread that signals on every change to `path`.
fn watch_settings(path: PathBuf) -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel::<()>();
    std::thread::spawn(move || {
        use notify::{EventKind, RecursiveMode, Watcher};
        let watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
            if let Ok(event) = res {
                match event.kind {
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Any => {
                        let _ = tx.send(());
                    }
                    _ => {}
                }
            }
        });
        match watcher {
            Ok(mut watcher) => {
                if let Err(e) = watcher.watch(&path, RecursiveMode::NonRecursive) {
                    log::warn!("cannot watch {}: {}", path.display(), e);
                    return;
                }
                loop {
                    std::thread::sleep(std::time::Duration::from_secs(3600));
                }
            }
            Err(e) => log::warn!("file watcher unavailable: {}", e),
        }
    });
    rx
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let changes = match (&args.settings, args.watch) {
        (Some(path), true) => Some(watch_settings(path.clone())),
        (None, true) => {
            log::warn!("--watch needs --settings; running once");
            None
        }
        _ => None,
    };

    loop {
        match args.settings() {
            Ok(settings) => run_frames(&args, &settings),
            Err(e) => {
                log::error!("failed to load settings: {}", e);
                if changes.is_none() {
                    return ExitCode::FAILURE;
                }
            }
        }
        let Some(rx) = &changes else {
            return ExitCode::SUCCESS;
        };
        log::info!("watching settings for changes");
        if rx.recv().is_err() {
            return ExitCode::SUCCESS;
        }
        // Editors often emit several events per save.
        std::thread::sleep(std::time::Duration::from_millis(100));
        while rx.try_recv().is_ok() {}
    }
}
