//! Upload gateway: multipart file parts are spooled to a temp file, pushed
//! to the object store and handed back as a public URL.

mod multipart;
mod services;
mod temp;

pub use multipart::{read_upload_form, UploadForm};
pub use services::{upload_on_media_host, MediaFolder};
pub use temp::TempUpload;
