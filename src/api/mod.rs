pub mod analysis;
pub mod attendance;
pub mod class;
pub mod dashboard;
pub mod error;
pub mod student;

#[cfg(test)]
mod tests;
