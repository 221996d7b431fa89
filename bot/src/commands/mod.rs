pub mod dispatcher;
pub mod parser;
pub mod utility;
