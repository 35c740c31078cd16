pub(crate) mod activity;
pub mod answers;
pub mod error;
pub(crate) mod grading;
pub mod lockout;
pub(crate) mod session_timing;
pub mod sessions;
pub(crate) mod unlock_codes;
