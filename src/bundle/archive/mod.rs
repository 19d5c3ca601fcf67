//! Bundle archive construction and mounting.
//!
//! [`ArchiveWriter`] builds the gzip-compressed tar image embedded in an
//! artifact. [`ArchiveImage`] is its read-only counterpart used at run time.

mod image;
mod writer;


pub use image::ArchiveImage;
pub use writer::ArchiveWriter;
