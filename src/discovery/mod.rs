//! Image discovery and overlay attachment.
//!
//! The engine finds qualifying images (present at start or inserted later anywhere in
//! the document) and gives each exactly one overlay control. It consumes host events as
//! a plain [`Stream`] of [`PageEvent`]s, so it runs the same against a browser binding
//! or a synthetic feed.
//!
//! The processed marker on each image is the only state shared between overlapping
//! discovery events. It is set while the document lock is held and before any other
//! attachment work, so a second report of the same element is always a no-op.

pub mod document;
pub mod events;
pub mod memory;
pub mod policy;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::services::encode::GarmentImage;
use crate::services::pipeline::{ResultTarget, TryOnPipeline};

use document::{HostDocument, NodeId, NodeKind};
use events::{MutationRecord, PageEvent};
use policy::SizePolicy;

pub const DEFAULT_OVERLAY_LABEL: &str = "Try on";

/// Nodes making up one attached overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlay {
    pub image: NodeId,
    pub container: NodeId,
    pub control: NodeId,
}

pub struct AttachmentEngine<D: HostDocument> {
    document: Arc<Mutex<D>>,
    pipeline: Arc<TryOnPipeline>,
    policy: SizePolicy,
    label: String,
    /// Images with a content-ready listener installed. Dropped with the image.
    awaiting_content: HashSet<NodeId>,
    by_container: HashMap<NodeId, Overlay>,
    by_control: HashMap<NodeId, Overlay>,
}

impl<D: HostDocument> AttachmentEngine<D> {
    pub fn new(document: Arc<Mutex<D>>, pipeline: Arc<TryOnPipeline>, policy: SizePolicy) -> Self {
        Self {
            document,
            pipeline,
            policy,
            label: DEFAULT_OVERLAY_LABEL.to_string(),
            awaiting_content: HashSet::new(),
            by_container: HashMap::new(),
            by_control: HashMap::new(),
        }
    }

    /// Engine using the configured size threshold and control label.
    pub fn from_config(document: Arc<Mutex<D>>, pipeline: Arc<TryOnPipeline>, config: &AppConfig) -> Self {
        Self::new(document, pipeline, config.size_policy()).with_label(config.overlay_label.clone())
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn document(&self) -> &Arc<Mutex<D>> {
        &self.document
    }

    pub fn overlays(&self) -> impl Iterator<Item = &Overlay> {
        self.by_container.values()
    }

    pub fn overlay_for_image(&self, image: NodeId) -> Option<Overlay> {
        self.by_container.values().find(|o| o.image == image).copied()
    }

    /// Attach to every image already in the document that is decoded and large enough.
    /// Images still decoding get a content-ready listener instead.
    pub fn scan_existing(&mut self) -> usize {
        let document = Arc::clone(&self.document);
        let mut doc = document.lock();

        let mut attached = 0;
        for image in doc.images() {
            if doc.is_content_ready(image) {
                if self.consider(&mut doc, image).is_some() {
                    attached += 1;
                }
            } else {
                self.awaiting_content.insert(image);
            }
        }

        tracing::info!(
            attached,
            pending = self.awaiting_content.len(),
            "Initial image scan complete"
        );
        attached
    }

    /// Consume page events until the feed ends.
    pub async fn observe<S>(&mut self, mut feed: S)
    where
        S: Stream<Item = PageEvent> + Unpin,
    {
        tracing::debug!("Observing page events");
        while let Some(event) = feed.next().await {
            // Jobs run detached; nothing waits on them.
            let _ = self.handle_event(event);
        }
        tracing::info!(
            overlays = self.by_container.len(),
            listeners = self.awaiting_content.len(),
            "Page event feed closed"
        );
    }

    /// Dispatch one page event. `Activate` returns the spawned job task.
    ///
    /// Activation spawns onto the current Tokio runtime and panics outside one.
    pub fn handle_event(&mut self, event: PageEvent) -> Option<JoinHandle<()>> {
        match event {
            PageEvent::Mutations(records) => self.handle_mutations(&records),
            PageEvent::ContentReady(image) => {
                self.content_ready(image);
            }
            PageEvent::PointerEnter(container) => self.set_hover(container, true),
            PageEvent::PointerLeave(container) => self.set_hover(container, false),
            PageEvent::Activate(control) => return self.activate(control),
        }
        None
    }

    /// Install content-ready listeners on inserted images and on images nested in
    /// inserted elements. A batch with removals drops state for images that are gone.
    pub fn handle_mutations(&mut self, records: &[MutationRecord]) {
        let document = Arc::clone(&self.document);
        let mut doc = document.lock();

        if records.iter().any(|r| !r.removed_nodes.is_empty()) {
            self.prune_removed(&doc);
        }

        for node in records.iter().flat_map(|r| r.added_nodes.iter().copied()) {
            match doc.kind(node) {
                Some(NodeKind::Image) => self.watch(&mut doc, node),
                Some(NodeKind::Element) => {
                    for image in doc.descendant_images(node) {
                        self.watch(&mut doc, image);
                    }
                }
                Some(NodeKind::Other) | None => {}
            }
        }
    }

    fn watch(&mut self, doc: &mut D, image: NodeId) {
        if self.awaiting_content.insert(image) {
            tracing::trace!(node = %image, "Content-ready listener installed");
        }
        // Already decoded images will not signal again.
        if doc.is_content_ready(image) {
            self.consider(doc, image);
        }
    }

    /// Content-ready signal from the host. Ignored for images nobody listens on.
    pub fn content_ready(&mut self, image: NodeId) -> Option<Overlay> {
        if !self.awaiting_content.contains(&image) {
            return None;
        }
        let document = Arc::clone(&self.document);
        let mut doc = document.lock();
        if doc.kind(image).is_none() {
            self.awaiting_content.remove(&image);
            return None;
        }
        self.consider(&mut doc, image)
    }

    /// Forget listeners and overlays whose image or container no longer exists.
    fn prune_removed(&mut self, doc: &D) {
        let listeners = self.awaiting_content.len();
        let overlays = self.by_container.len();

        self.awaiting_content.retain(|image| doc.kind(*image).is_some());
        let alive = |o: &Overlay| doc.kind(o.image).is_some() && doc.kind(o.container).is_some();
        self.by_container.retain(|_, o| alive(o));
        self.by_control.retain(|_, o| alive(o));

        tracing::trace!(
            listeners = listeners - self.awaiting_content.len(),
            overlays = overlays - self.by_container.len(),
            "Pruned removed images"
        );
    }

    fn forget(&mut self, overlay: &Overlay) {
        self.awaiting_content.remove(&overlay.image);
        self.by_container.remove(&overlay.container);
        self.by_control.remove(&overlay.control);
    }

    fn consider(&mut self, doc: &mut D, image: NodeId) -> Option<Overlay> {
        if doc.is_processed(image) {
            return None;
        }
        let size = doc.natural_size(image);
        if !self.policy.admits(size) {
            tracing::trace!(node = %image, width = size.width, height = size.height, "Image below size threshold");
            return None;
        }
        self.attach_locked(doc, image)
    }

    /// Attach an overlay to `image` unless it is already processed.
    pub fn attach(&mut self, image: NodeId) -> Option<Overlay> {
        let document = Arc::clone(&self.document);
        let mut doc = document.lock();
        self.attach_locked(&mut doc, image)
    }

    fn attach_locked(&mut self, doc: &mut D, image: NodeId) -> Option<Overlay> {
        if doc.is_processed(image) {
            return None;
        }
        doc.mark_processed(image);

        let container = doc.wrap_in_container(image);
        let control = doc.append_control(container, &self.label);
        let overlay = Overlay {
            image,
            container,
            control,
        };
        self.by_container.insert(container, overlay);
        self.by_control.insert(control, overlay);

        metrics::counter!("overlays_attached_total").increment(1);
        tracing::debug!(node = %image, container = %container, control = %control, "Overlay attached");
        Some(overlay)
    }

    fn set_hover(&mut self, container: NodeId, hovered: bool) {
        let Some(overlay) = self.by_container.get(&container).copied() else {
            return;
        };
        let mut doc = self.document.lock();
        if doc.kind(overlay.control).is_none() {
            drop(doc);
            self.forget(&overlay);
            return;
        }
        doc.set_visible(overlay.control, hovered);
    }

    /// Start a try-on job for the image behind `control`. Returns the job task, or
    /// `None` when the control is unknown or the image pixels cannot be read.
    pub fn activate(&mut self, control: NodeId) -> Option<JoinHandle<()>> {
        let overlay = *self.by_control.get(&control)?;

        let pixels = {
            let doc = self.document.lock();
            if doc.kind(overlay.image).is_none() {
                drop(doc);
                tracing::debug!(node = %overlay.image, "Activated image no longer in document");
                self.forget(&overlay);
                return None;
            }
            doc.capture_pixels(overlay.image)
        };
        let Some(pixels) = pixels else {
            tracing::warn!(node = %overlay.image, "Image pixels unavailable; try-on skipped");
            return None;
        };

        let garment = match GarmentImage::from_image(&pixels) {
            Ok(garment) => garment,
            Err(e) => {
                tracing::warn!(node = %overlay.image, error = %e, "Failed to encode garment image");
                return None;
            }
        };

        tracing::info!(node = %overlay.image, "Try-on requested");
        let pipeline = Arc::clone(&self.pipeline);
        let target = ImageSourceTarget::new(Arc::clone(&self.document), overlay.image);
        Some(tokio::spawn(async move {
            pipeline.run_best_effort(&garment, Some(&target)).await;
        }))
    }
}

/// Writes a finished job's output into an image element's source.
pub struct ImageSourceTarget<D: HostDocument> {
    document: Arc<Mutex<D>>,
    image: NodeId,
}

impl<D: HostDocument> ImageSourceTarget<D> {
    pub fn new(document: Arc<Mutex<D>>, image: NodeId) -> Self {
        Self { document, image }
    }
}

impl<D: HostDocument> ResultTarget for ImageSourceTarget<D> {
    fn apply(&self, asset_url: &str) {
        if self.document.lock().set_source(self.image, asset_url) {
            tracing::info!(node = %self.image, url = %asset_url, "Image source replaced");
        } else {
            tracing::debug!(node = %self.image, "Image no longer in document; result dropped");
        }
    }
}
