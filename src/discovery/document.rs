use image::DynamicImage;

/// Handle to a node of the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Image,
    Element,
    /// Text, comments and anything else that cannot contain images.
    Other,
}

/// Natural pixel size of an image. Zero until the image data has decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const ZERO: Dimensions = Dimensions { width: 0, height: 0 };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// The slice of a host DOM the attachment engine works against.
///
/// Browser bindings implement this over live elements; `MemoryDocument` implements it
/// in memory.
pub trait HostDocument: Send + 'static {
    /// Every image element currently in the document, in document order.
    fn images(&self) -> Vec<NodeId>;

    /// `None` once the node no longer exists.
    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    fn descendant_images(&self, node: NodeId) -> Vec<NodeId>;

    fn natural_size(&self, image: NodeId) -> Dimensions;

    fn is_content_ready(&self, image: NodeId) -> bool;

    fn is_processed(&self, image: NodeId) -> bool;

    fn mark_processed(&mut self, image: NodeId);

    /// Wrap `image` in an inline positioning container at its current position and
    /// return the container.
    fn wrap_in_container(&mut self, image: NodeId) -> NodeId;

    /// Append a hidden control anchored to the container's top-right corner.
    fn append_control(&mut self, container: NodeId, label: &str) -> NodeId;

    fn set_visible(&mut self, node: NodeId, visible: bool);

    /// Current pixels of a decoded image, if the host allows reading them.
    fn capture_pixels(&self, image: NodeId) -> Option<DynamicImage>;

    /// Replace the visual source of an image. Returns false if the image is gone.
    fn set_source(&mut self, image: NodeId, url: &str) -> bool;
}
