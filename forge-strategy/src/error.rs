use thiserror::Error;

/// `UserCodeError` raised inside a strategy hook, per §4.8/§7: logged with the hook name;
/// `on_save`/`on_load` re-raise to the host via [`crate::runner::StrategyRunner`], every other
/// hook is suppressed so the event loop survives.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("strategy already disposed, all operations error")]
    Disposed,

    #[error("user code error in {hook}: {message}")]
    UserCode { hook: &'static str, message: String },
}
