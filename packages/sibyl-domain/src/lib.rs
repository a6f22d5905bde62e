pub mod context;
pub mod quota;
pub mod tokens;
