//! The annotation session: one open image, its annotations, and the single
//! tool that currently receives input.
//!
//! UI actions enter through [`Session::perform`], which is where every
//! failure ends up. Errors are logged and turned into a status message; they
//! never leave the session.

use std::path::{Path, PathBuf};

use log::{debug, error, info};

use crate::image_host::{DecodeError, ImageDecoder, PixelGrid};
use crate::record::{Kind, Record};
use crate::render::{DisplayList, Primitive};
use crate::shortcuts;
use crate::store::{sidecar_path, AnnotationStore, StoreError};
use crate::tools::{InputEvent, Tool};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    UnsupportedFormat(DecodeError),
    #[error(transparent)]
    ImageRead(DecodeError),
    #[error("annotation file {}: {source}", path.display())]
    Sidecar {
        path: PathBuf,
        #[source]
        source: StoreError,
    },
    #[error("no image is open")]
    NoActiveImage,
}

impl From<DecodeError> for SessionError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Io { .. } => SessionError::ImageRead(err),
            DecodeError::Unsupported { .. } | DecodeError::Dimensions { .. } => {
                SessionError::UnsupportedFormat(err)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    ActivateTool(Kind),
    OpenImage(PathBuf),
    Save,
}

/// Who gets keystrokes: the global shortcuts, or a tool that is taking text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusScope {
    Shortcuts,
    TextEntry,
}

#[derive(Debug)]
pub struct OpenImage {
    pub path: PathBuf,
    pub sidecar: PathBuf,
    pub pixels: PixelGrid,
    /// Bumped on every successful open so views can refresh cached textures.
    pub generation: u64,
}

pub struct Session<D> {
    decoder: D,
    image: Option<OpenImage>,
    store: AnnotationStore,
    display: DisplayList,
    active: Option<Tool>,
    status: Option<String>,
    generation: u64,
}

impl<D: ImageDecoder> Session<D> {
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            image: None,
            store: AnnotationStore::default(),
            display: DisplayList::default(),
            active: None,
            status: None,
            generation: 0,
        }
    }

    pub fn image(&self) -> Option<&OpenImage> {
        self.image.as_ref()
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn display(&self) -> &DisplayList {
        &self.display
    }

    pub fn active_kind(&self) -> Option<Kind> {
        self.active.as_ref().map(Tool::kind)
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn preview(&self) -> Vec<Primitive> {
        self.active.as_ref().map(Tool::preview).unwrap_or_default()
    }

    pub fn focus(&self) -> FocusScope {
        match &self.active {
            Some(tool) if tool.captures_keyboard() => FocusScope::TextEntry,
            _ => FocusScope::Shortcuts,
        }
    }

    // ── Actions ─────────────────────────────────────────────────────────────

    pub fn perform(&mut self, action: Action) {
        let result = match action {
            Action::ActivateTool(kind) => {
                self.activate(kind);
                Ok(())
            }
            Action::OpenImage(path) => self.open_image(&path).map(|loaded| {
                self.status = Some(format!(
                    "Opened {} ({} annotations)",
                    path.display(),
                    loaded
                ));
            }),
            Action::Save => self.save().map(|saved| {
                if let Some(image) = &self.image {
                    self.status = Some(format!(
                        "Saved {} annotations to {}",
                        saved,
                        image.sidecar.display()
                    ));
                }
            }),
        };
        if let Err(err) = result {
            self.report(err);
        }
    }

    fn report(&mut self, err: SessionError) {
        match err {
            SessionError::NoActiveImage => debug!("nothing to save: no image is open"),
            err => {
                error!("{err}");
                self.status = Some(err.to_string());
            }
        }
    }

    /// Makes `kind` the only tool receiving input. The previous tool is
    /// deactivated first, which commits any text it was holding.
    pub fn activate(&mut self, kind: Kind) {
        if let Some(mut previous) = self.active.take() {
            if let Some(record) = previous.deactivate() {
                self.commit(record);
            }
        }
        debug!("{kind} tool active");
        self.active = Some(Tool::new(kind));
    }

    /// Decodes `path`, replaces the current image, and reloads its sidecar if
    /// one exists. Returns the number of annotations loaded.
    ///
    /// A rejected image leaves the session untouched. A bad sidecar leaves the
    /// new image open with whatever records came before the bad line.
    pub fn open_image(&mut self, path: &Path) -> Result<usize, SessionError> {
        let pixels = self.decoder.decode(path)?;

        if let Some(tool) = self.active.as_mut() {
            tool.cancel();
        }
        self.store.clear();
        self.display.clear();
        self.generation += 1;

        let sidecar = sidecar_path(path);
        info!(
            "opened {} ({}x{})",
            path.display(),
            pixels.width(),
            pixels.height()
        );
        self.image = Some(OpenImage {
            path: path.to_path_buf(),
            sidecar: sidecar.clone(),
            pixels,
            generation: self.generation,
        });

        if !sidecar.exists() {
            debug!("no annotations at {}", sidecar.display());
            return Ok(0);
        }
        let display = &mut self.display;
        let loaded = self
            .store
            .load_file(&sidecar, |record| display.push_record(record))
            .map_err(|source| SessionError::Sidecar {
                path: sidecar.clone(),
                source,
            })?;
        info!("loaded {} annotations from {}", loaded, sidecar.display());
        Ok(loaded)
    }

    /// Writes every annotation to the image's sidecar, after committing the
    /// gesture in progress. Returns the number of annotations written.
    pub fn save(&mut self) -> Result<usize, SessionError> {
        let sidecar = self
            .image
            .as_ref()
            .map(|image| image.sidecar.clone())
            .ok_or(SessionError::NoActiveImage)?;

        if let Some(record) = self.active.as_mut().and_then(Tool::flush) {
            self.commit(record);
        }

        let saved = self
            .store
            .save_file(&sidecar)
            .map_err(|source| SessionError::Sidecar {
                path: sidecar.clone(),
                source,
            })?;
        info!("saved {} annotations to {}", saved, sidecar.display());
        Ok(saved)
    }

    // ── Input ───────────────────────────────────────────────────────────────

    pub fn handle(&mut self, event: InputEvent) {
        if let InputEvent::Key(key) = &event {
            if self.focus() == FocusScope::Shortcuts {
                if let Some(kind) = shortcuts::tool_for(key) {
                    self.perform(Action::ActivateTool(kind));
                    return;
                }
            }
        }
        if event.is_pointer() && self.image.is_none() {
            return;
        }
        let Some(tool) = self.active.as_mut() else {
            return;
        };
        if let Some(record) = tool.handle(&event) {
            self.commit(record);
        }
    }

    fn commit(&mut self, record: Record) {
        debug!("new annotation: {}", record.to_line());
        self.display.push_record(&record);
        self.store.push(record);
    }
}
