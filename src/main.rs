use std::error::Error;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::{info, warn};
use web_time::Instant;

use mri_slab::{
    Axis, InputEvent, NavigationController, OverlayKind, RecordingRenderer, SessionCursor, SortBy,
    ViewerConfig, Volume, VolumeId, VolumeLoader,
};

/// Scroll a slab through the co-registered volumes of one or more sessions
/// and write a preview of every view.
#[derive(Parser)]
#[command(name = "mri-slab")]
#[command(author, version, about)]
struct Cli {
    /// Session directories with one subdirectory per modality (t1, flair, ...)
    #[arg(required = true)]
    sessions: Vec<PathBuf>,

    /// Viewer configuration (YAML)
    #[arg(short, long, default_value = "viewer.yaml")]
    config: PathBuf,

    /// Where previews and colorbars are written
    #[arg(short, long, default_value = "out")]
    output: PathBuf,

    /// Slab axis, overrides the configured default
    #[arg(short, long, value_enum)]
    axis: Option<Axis>,

    /// Slab thickness, overrides the configured value
    #[arg(short, long)]
    thickness: Option<f64>,

    /// Number of advance events replayed per session
    #[arg(short, long, default_value_t = 4)]
    steps: u32,

    #[arg(long, value_enum, default_value_t = SortBy::ImagePositionPatient)]
    sort_by: SortBy,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = ViewerConfig::load(&cli.config)?;
    let mut controller = NavigationController::new(config);
    std::fs::create_dir_all(&cli.output)?;

    let mut cursor = SessionCursor::new(cli.sessions.len());
    loop {
        let session = &cli.sessions[cursor.current()];
        info!(
            "session {}/{}: {:?}",
            cursor.current() + 1,
            cursor.count(),
            session
        );
        controller.reset();
        run_session(&cli, &mut controller, session).await?;
        if !cursor.next() {
            break;
        }
    }
    Ok(())
}

async fn run_session(
    cli: &Cli,
    controller: &mut NavigationController,
    session: &Path,
) -> Result<(), Box<dyn Error>> {
    let entries = VolumeLoader::discover_session(session)?;
    if entries.is_empty() {
        warn!("no modality directories in {:?}", session);
        return Ok(());
    }
    let volumes = VolumeLoader::load_session_async(entries, cli.sort_by).await?;

    let mut loaded: Vec<(VolumeId, Volume)> = Vec::new();
    for (modality, volume) in volumes {
        let id = VolumeId::new(modality.to_string());
        let renderer = Box::new(RecordingRenderer::new());
        controller.register_volume(id.clone(), modality, &volume, renderer);
        loaded.push((id, volume));
    }
    attach_masks(controller, session, &loaded[0].0, cli.sort_by);

    if let Some(thickness) = cli.thickness {
        controller.set_thickness(thickness);
    }
    controller.set_axis(cli.axis.unwrap_or(controller.config().default_axis))?;
    for _ in 0..cli.steps {
        controller.handle_event(InputEvent::advance())?;
    }
    if let Some(tick) = controller.poll_redraw(Instant::now()) {
        info!("drew {} views, {} changes coalesced", loaded.len(), tick.coalesced);
    }

    let slice = controller.slice();
    println!("session      {}", session.display());
    println!("axis         {}", slice.axis());
    println!("thickness    {}", slice.thickness());
    println!("position     {}", slice.position()?);
    println!("cropping box {:?}", controller.cropping_box()?.planes());
    println!("camera       {:?}", controller.camera().get());

    let stem = session
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("session");
    for (id, volume) in &loaded {
        let name = id.as_str().to_lowercase().replace(' ', "_");
        if let Some(range) = controller.optimal_range(id) {
            println!("{id:<13} window [{}, {}]", range.min, range.max);
        }
        if let Some(tf) = controller.transfer_function(id) {
            tf.colorbar(256, 16)
                .save(cli.output.join(format!("{stem}_{name}_colorbar.png")))?;
        }
        match controller.slab_preview(id, volume)? {
            Some(image) => image.save(cli.output.join(format!("{stem}_{name}_slab.png")))?,
            None => warn!("slab misses {id}"),
        }
    }
    Ok(())
}

/// Masks live next to the modality directories, e.g. `ses-01/lesion`.
fn attach_masks(
    controller: &mut NavigationController,
    session: &Path,
    host: &VolumeId,
    sort_by: SortBy,
) {
    for kind in OverlayKind::ALL {
        let dir = session.join(kind.to_string().to_lowercase());
        if !dir.is_dir() {
            continue;
        }
        match VolumeLoader::load_from_directory(&dir, sort_by) {
            Ok(mask) => {
                if let Err(err) = controller.attach_overlay(
                    host,
                    kind,
                    mask.bounds(),
                    Box::new(RecordingRenderer::new()),
                ) {
                    warn!("could not attach {kind} mask: {err}");
                }
            }
            Err(err) => warn!("could not load {kind} mask from {:?}: {err}", dir),
        }
    }
}
