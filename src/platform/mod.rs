mod windows;

pub use windows::WindowsSurface;
