pub mod check;
pub mod completions;
pub mod convert;
pub mod help;
pub mod library;
pub mod parmest;
pub mod solve;
