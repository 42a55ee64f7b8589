pub mod decode;
pub mod speech;
pub mod tabular;
