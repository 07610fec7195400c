// Record types for the externally-supplied gallery dataset.
//
// One file per subject area. The CSV headers are authoritative; every
// struct derives Deserialize against those headers and Serialize for
// report export.

pub mod artist;
pub mod museum;
pub mod pricing;
pub mod work;

pub use artist::Artist;
pub use museum::{Museum, MuseumHours};
pub use pricing::{CanvasSize, ProductSize};
pub use work::{ImageLink, Subject, Work};
