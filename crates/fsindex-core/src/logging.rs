/// Initialize `env_logger` once. The engine logs internally (spec §7's
/// "log and continue" policy) but owns no sink of its own; where those
/// log lines end up is the caller's concern.
pub fn init_logging() {
    let _ = env_logger::try_init();
}
