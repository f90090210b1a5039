pub mod encode;
pub mod pipeline;
pub mod tryon;
