mod capture;

pub use capture::{Camera, CameraError};
