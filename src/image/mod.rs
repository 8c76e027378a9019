pub mod io;
pub mod mask;
pub mod raster;
pub mod traits;

pub use self::mask::{HoleBounds, ValidityMask};
pub use self::raster::Raster;
pub use self::traits::{ImageView, ImageViewMut, Region, Rows};
