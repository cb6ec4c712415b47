//! Interactive state around the pure pipeline: which image is current, which
//! load is still wanted, and whether a large grid has been approved.

use image::DynamicImage;

use crate::geometry::{resolve, Geometry, PixelShape};
use crate::sample::{LARGE_OUTPUT_CELLS, SAFE_DEFAULT_SIZE};
use crate::{render_at, Config, Rendering, TextImageError};

/// Identity of one successfully decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(u64);

/// Handle for a load in flight; only the newest ticket may install an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(ImageId),
    /// A newer load was started; this result was dropped.
    Superseded,
}

/// Asked before rendering a grid above [`LARGE_OUTPUT_CELLS`].
pub trait Confirm {
    fn confirm_large_output(&mut self, geometry: &Geometry) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&Geometry) -> bool,
{
    fn confirm_large_output(&mut self, geometry: &Geometry) -> bool {
        self(geometry)
    }
}

/// The settings that decide the grid size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeSettings {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub lock_aspect: bool,
    pub shape: PixelShape,
}

impl SizeSettings {
    pub fn of(config: &Config) -> Self {
        Self {
            width: config.width,
            height: config.height,
            lock_aspect: config.lock_aspect,
            shape: config.shape,
        }
    }

    fn apply(&self, config: &mut Config) {
        config.width = self.width;
        config.height = self.height;
        config.lock_aspect = self.lock_aspect;
        config.shape = self.shape;
    }
}

enum Verdict {
    Proceed,
    Revert,
}

/// Large-output approval, scoped to one image.
#[derive(Debug, Default)]
struct SizeGuard {
    image: Option<ImageId>,
    granted: bool,
    last_safe: Option<(ImageId, SizeSettings)>,
}

impl SizeGuard {
    /// Forgets any approval when `image` is not the one it was given for.
    fn track(&mut self, image: ImageId) {
        if self.image != Some(image) {
            self.image = Some(image);
            self.granted = false;
        }
    }

    fn check(
        &mut self,
        image: ImageId,
        settings: SizeSettings,
        geometry: &Geometry,
        confirm: &mut impl Confirm,
    ) -> Verdict {
        self.track(image);
        if self.granted {
            return Verdict::Proceed;
        }

        if geometry.cells() > LARGE_OUTPUT_CELLS {
            if !confirm.confirm_large_output(geometry) {
                log::warn!("declined {} grid ({} cells)", geometry, geometry.cells());
                return Verdict::Revert;
            }
            log::debug!("large output approved for image {:?}", image);
            self.granted = true;
            return Verdict::Proceed;
        }

        self.last_safe = Some((image, settings));
        Verdict::Proceed
    }

    /// Settings to fall back to after a decline. `last_safe` only counts if
    /// it was recorded for the same image.
    fn fallback(&self, image: ImageId, current: SizeSettings) -> SizeSettings {
        match self.last_safe {
            Some((safe_image, safe)) if safe_image == image => safe,
            _ => SizeSettings {
                width: Some(SAFE_DEFAULT_SIZE.0),
                height: Some(SAFE_DEFAULT_SIZE.1),
                ..current
            },
        }
    }
}

#[derive(Default)]
pub struct Session {
    next_id: u64,
    pending: Option<LoadTicket>,
    image: Option<(ImageId, DynamicImage)>,
    guard: SizeGuard,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Starts a load, superseding any load still in flight.
    pub fn begin_load(&mut self) -> LoadTicket {
        let ticket = LoadTicket(self.next_id());
        if let Some(previous) = self.pending.replace(ticket) {
            log::debug!("load {:?} superseded by {:?}", previous, ticket);
        }
        ticket
    }

    /// Decodes the bytes for `ticket`.
    ///
    /// On a decode failure the current image stays in place. The previous
    /// image is dropped only once a newer one decodes.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        bytes: &[u8],
    ) -> Result<LoadOutcome, TextImageError> {
        if self.pending != Some(ticket) {
            log::warn!("ignoring result of stale load {:?}", ticket);
            return Ok(LoadOutcome::Superseded);
        }
        self.pending = None;

        let decoded = image::load_from_memory(bytes)?;
        let id = ImageId(self.next_id());
        log::debug!(
            "loaded image {:?} ({}x{})",
            id,
            decoded.width(),
            decoded.height()
        );
        self.image = Some((id, decoded));
        Ok(LoadOutcome::Loaded(id))
    }

    pub fn load(&mut self, bytes: &[u8]) -> Result<ImageId, TextImageError> {
        let ticket = self.begin_load();
        match self.finish_load(ticket, bytes)? {
            LoadOutcome::Loaded(id) => Ok(id),
            LoadOutcome::Superseded => Err(TextImageError::NoImage),
        }
    }

    pub fn image(&self) -> Option<&DynamicImage> {
        self.image.as_ref().map(|(_, image)| image)
    }

    pub fn image_id(&self) -> Option<ImageId> {
        self.image.as_ref().map(|(id, _)| *id)
    }

    pub fn large_output_granted(&self) -> bool {
        self.image_id().is_some() && self.guard.image == self.image_id() && self.guard.granted
    }

    /// Runs the full pipeline for the current image.
    ///
    /// Grids above [`LARGE_OUTPUT_CELLS`] go through `confirm` unless this
    /// image was already approved. A decline rewrites the size settings in
    /// `config` (to the last safe ones, or [`SAFE_DEFAULT_SIZE`] for a new
    /// image) and starts over.
    pub fn regenerate(
        &mut self,
        config: &mut Config,
        confirm: &mut impl Confirm,
    ) -> Result<Rendering, TextImageError> {
        let (id, image) = self.image.as_ref().ok_or(TextImageError::NoImage)?;
        let id = *id;

        loop {
            let geometry = config.geometry_for(image);
            let settings = SizeSettings::of(config);
            match self.guard.check(id, settings, &geometry, confirm) {
                Verdict::Proceed => return render_at(image, config, geometry),
                Verdict::Revert => self.guard.fallback(id, settings).apply(config),
            }
        }
    }

    /// Toggles the aspect lock. Unlocking keeps the picture the same size by
    /// writing the resolved width and pre-division height into `config`.
    pub fn set_lock_aspect(&self, config: &mut Config, lock: bool) {
        if !lock && config.lock_aspect {
            if let Some(image) = self.image() {
                let geometry = resolve(
                    config.width,
                    config.height,
                    image.width(),
                    image.height(),
                    true,
                    config.shape,
                );
                config.width = Some(geometry.width);
                config.height = Some(geometry.unscaled_height);
            }
        }
        config.lock_aspect = lock;
    }
}
