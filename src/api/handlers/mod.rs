pub mod forms;
pub mod health;
pub mod upload;
