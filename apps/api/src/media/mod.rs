//! Image hosting on Cloudinary: signed uploads and deletions, folder
//! browsing and delivery URL helpers.

pub mod cloudinary;
pub mod handlers;

pub use cloudinary::CloudinaryClient;
