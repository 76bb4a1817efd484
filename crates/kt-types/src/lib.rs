pub mod errors;
pub mod knob;
pub mod message;
pub mod space;

pub use errors::*;
pub use knob::*;
pub use message::*;
pub use space::*;
