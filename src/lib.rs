pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

pub use crate::core::config::{ConfigError, Settings};
pub use crate::core::state::AppState;
pub use crate::db::types::{ExamStatus, ParticipationStatus, QuestionKind};
pub use crate::db::{init_pool, run_migrations};
pub use crate::schemas::session::{SessionFinished, SessionStarted};
pub use crate::services::answers::{set_manual_score, submit_answer, AnswerOutcome, AnswerPayload};
pub use crate::services::error::SessionError;
pub use crate::services::lockout::{block, force_unblock, generate_unlock_code, unblock};
pub use crate::services::sessions::{
    finalize_grading, finish_session, start_session, FinishTrigger,
};
pub use crate::tasks::reconcile::{auto_expire_exams, auto_finish_sessions};

/// Worker entry point: initializes config, telemetry, metrics and the store,
/// then runs the two reconciliation loops until shutdown.
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    core::telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let state = AppState::new(settings, db_pool);

    tracing::info!(
        environment = %state.settings().runtime().environment.as_str(),
        auto_finish_interval = state.settings().scheduler().auto_finish_interval_seconds,
        auto_expire_interval = state.settings().scheduler().auto_expire_interval_seconds,
        "examd reconciler worker starting"
    );

    tasks::scheduler::run(state).await
}
