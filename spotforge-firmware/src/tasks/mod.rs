//! Embassy tasks

pub mod control;
