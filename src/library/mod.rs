pub mod resolver;
pub mod upload;

pub use resolver::LibraryResolver;
pub use upload::{
    default_library_path, new_library, prepare_upload, rename_upload, upload_library, PreparedUpload,
    UploadOutcome,
};
