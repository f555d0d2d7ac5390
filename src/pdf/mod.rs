//! PDF manipulation module

mod content;
pub mod font;
pub mod logo;
pub mod merge;
pub mod normalize;
pub mod stamp;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used items
pub use content::page_size;
pub use font::{encode_win_ansi, StampFont};
pub use logo::LogoImage;
pub use merge::{merge_files, merge_sources, MergeOptions, MergeOutput, PageSource, SourceRole};
pub use normalize::{normalize_page, Normalization};
pub use stamp::{stamp_all, StampContext, StampLayout, StampReport, STAMP_XOBJECT};
pub use validate::{document_info, page_count, validate, DocumentInfo};
