//! Control loop graph assembly.

mod builder;
mod painter;

pub use builder::{GraphBuildError, LoopGraphBuilder};
pub use painter::{ChainPainter, MicroService, Painter};
