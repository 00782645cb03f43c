pub mod core;
pub mod interface;
pub mod model;
pub mod utils;

#[cfg(test)]
mod test_support;
