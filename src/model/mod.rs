//! Document model types.
//!
//! This module defines the data flowing through the pipeline, from the
//! caller's input [`Document`] to the final [`ExtractionResult`].

mod document;
mod page;
mod question;
mod result;

pub use document::Document;
pub use page::{Page, PageContent, PageKind};
pub use question::{Question, QuestionOption};
pub use result::{ExtractionResult, PageReport};
