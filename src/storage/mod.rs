pub mod local;
pub mod traits;

pub use local::LocalImageStore;
pub use traits::{ImageStorage, NamingContext, StoredImage};
