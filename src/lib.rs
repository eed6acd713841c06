//! # mri-slab
//!
//! This crate keeps several co-registered MRI volumes (T1, FLAIR, SWI
//! magnitude and phase) in lock step while a reader scrolls a thin slab
//! through them.

//!
//! All registered volumes share one global frame (the union of their
//! bounding boxes), one slab and one camera. Moving the slab, changing its
//! thickness or switching the axis updates every view at once. Slabs can be
//! cut along the three world axes, each bound to one anatomical view:
//!  - X: Coronal
//!  - Y: Axial
//!  - Z: Sagittal
//!
//!  Every volume is windowed from its own intensity histogram (1st to 99th
//!  percentile) and gets a modality-specific transfer function whose opacity
//!  is scaled with the slab thickness, so brightness stays constant while
//!  the slab grows or shrinks. Lesion and PRL masks follow the slab of the
//!  base volumes. The engine itself never draws; it pushes state into
//!  [`VolumeRenderer`] implementations provided by the host.
//!
//! # Roadmap
//!
//!  - Animated playback of timepoints
//!  - Oblique slabs
//!
//! # Examples
//!
//! ## Loading a session and scrolling through it
//!
//! Load the modality subdirectories of `ses-01/`, register them with a
//! headless renderer and advance the slab twice.
//!
//! ```no_run
//! # use mri_slab::{NavigationController, RecordingRenderer, SortBy, ViewerConfig, VolumeLoader};
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let entries = VolumeLoader::discover_session("ses-01")?;
//! let volumes = VolumeLoader::load_session_async(entries, SortBy::ImagePositionPatient).await?;
//!
//! let mut controller = NavigationController::new(ViewerConfig::default());
//! for (modality, volume) in &volumes {
//!     let id = modality.to_string().as_str().into();
//!     controller.register_volume(id, *modality, volume, Box::new(RecordingRenderer::new()));
//! }
//! controller.handle_event(mri_slab::InputEvent::advance())?;
//! controller.handle_event(mri_slab::InputEvent::advance())?;
//! println!("{:?}", controller.cropping_box()?);
//! # Ok(())
//! # }
//! ```

pub mod bounds;
pub mod camera;
pub mod config;
pub mod enums;
pub mod error;
pub mod intensity;
pub mod navigation;
pub mod overlay;
pub mod redraw;
pub mod renderer;
pub mod session;
pub mod slice_state;
pub mod transfer_function;
pub mod volume;
pub mod volume_loader;

pub use bounds::{Bounds, BoundsRegistry};
pub use camera::{CameraPose, SharedCamera};
pub use config::{ConfigError, ViewerConfig};
pub use enums::{Axis, Modality, OverlayKind, SortBy};
pub use error::EngineError;
pub use intensity::{Histogram, OptimalRange, compute_optimal_range};
pub use navigation::{InputEvent, InputKind, NavigationController};
pub use overlay::{OverlayStatus, OverlaySync};
pub use redraw::{FrameClock, RedrawTick};
pub use renderer::{RecordingRenderer, VolumeRenderer};
pub use session::SessionCursor;
pub use slice_state::{CroppingBox, SliceLimits, SliceState};
pub use transfer_function::TransferFunction;
pub use volume::{Volume, VolumeId};
pub use volume_loader::{VolumeLoader, VolumeLoaderError};
