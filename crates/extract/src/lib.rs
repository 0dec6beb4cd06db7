mod consts;
mod document;
mod epub;
pub mod error;
mod filename;
pub mod markup;
pub mod models;
mod pdf;
#[cfg(any(test, feature = "fixtures"))]
pub mod testing;

pub use crate::document::{Document, DocumentFormat, DocumentReader, base_name};
pub use crate::epub::EpubReader;
pub use crate::filename::{FilenameMetadata, normalize};
pub use crate::pdf::{PdfReader, render_cover};
