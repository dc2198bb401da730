pub mod listing;
pub mod moves;
pub mod operations;
pub mod prompt;
pub mod runtime;
pub mod search;
pub mod selection;
pub mod session;
pub mod storage;
pub mod transfer;
