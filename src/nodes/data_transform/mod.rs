pub mod code;
pub mod data;

pub use code::CodeProcessor;
pub use data::DataProcessor;
