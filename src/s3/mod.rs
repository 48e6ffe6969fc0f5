pub mod client;
mod error;
pub mod object;
pub mod upload;

pub use client::S3Store;
pub use object::{S3Bucket, S3Object};
pub use upload::S3Writer;
