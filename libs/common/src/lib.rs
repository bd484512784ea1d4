pub mod id;

pub use id::PeerId;
