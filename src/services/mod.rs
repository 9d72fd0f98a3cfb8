pub mod segmentation;
pub mod storage;
pub mod upload_service;
