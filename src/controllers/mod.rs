pub mod thread_surface;

pub use thread_surface::{OrderContext, SurfaceState, ThreadSurface};
