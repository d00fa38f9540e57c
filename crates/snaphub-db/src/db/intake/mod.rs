pub mod process;
pub mod upload;

pub use process::ProcessRepository;
pub use upload::UploadRepository;
