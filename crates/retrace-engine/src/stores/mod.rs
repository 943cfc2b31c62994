//! Concrete collaborators: local files for documents, blobs and output, HTTP
//! for remote blobs and accessibility-tree generation.

pub mod fs;
pub mod http;

pub use fs::{FsBlobStore, FsDocumentStore, JsonlStepSink};
pub use http::{HttpAxTreeGenerator, HttpBlobStore};
