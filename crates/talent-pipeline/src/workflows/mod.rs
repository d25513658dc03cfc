pub mod admission;
pub mod applications;
pub mod notifications;
pub mod retry;
pub mod scoring;
