pub mod engine;
pub mod model;
pub mod selection;
pub mod table;
