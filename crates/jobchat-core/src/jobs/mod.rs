//! Job polling

pub mod poll;

pub use poll::PollController;
