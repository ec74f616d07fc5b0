mod frame;
mod latest;

pub use frame::Frame;
pub use latest::FrameBuffer;
