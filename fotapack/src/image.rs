mod codec;
mod fota_header;
mod sparse;

pub use codec::{Format, LineEnding};
pub use fota_header::{FotaHeader, FOTA_HEADER_SIZE};
pub(crate) use sparse::last_address;
pub use sparse::{Segment, SparseImage, StartAddress, DEFAULT_FILL};
