pub mod segmenter;
pub mod storage;
