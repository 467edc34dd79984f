//! Frame rendering
//!
//! [`canvas`] is the raster target; [`frame`] paints the globe layers onto it.

pub mod canvas;
pub mod frame;

pub use canvas::Canvas;
pub use frame::FrameRenderer;
