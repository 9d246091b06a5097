pub mod codedata;
pub mod diagram;
pub mod flow_node;
pub mod property;

pub use codedata::*;
pub use diagram::*;
pub use flow_node::*;
pub use property::*;
