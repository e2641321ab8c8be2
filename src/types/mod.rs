pub mod material;
pub mod mesh;

pub use material::{ChannelKind, MaterialChannels, MaterialLibrary, MaterialTemplate, TextureData};
pub use mesh::{IndexedMesh, SubmeshRange};
