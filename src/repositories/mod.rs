pub(crate) mod activity_logs;
pub(crate) mod answers;
pub(crate) mod exams;
pub(crate) mod participations;
pub(crate) mod questions;
pub(crate) mod results;
