//! Filesystem object storage for uploaded and generated images.

mod cap_std_image_store;

pub use cap_std_image_store::CapStdImageStore;
