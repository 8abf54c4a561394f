pub mod config;
pub mod count;
pub mod import;
pub mod preflight;
pub mod seed;
pub mod wait;

#[cfg(test)]
pub mod testing;
