pub mod check_event;
pub mod poll_pass;

pub use check_event::CheckEventUseCase;
pub use poll_pass::{PassReport, PollPassUseCase};
