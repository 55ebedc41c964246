use timesheet_domain::ActivityState;

/// The outcome of applying a requested action against the currently active
/// state. Consumers pattern-match exhaustively; `NoChange` is never
/// produced by [`decide`] itself (every combination of active/requested
/// state resolves to one of the other two variants) — it exists for the
/// caller to use when request validation fails before `decide` is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Caller must insert a new active session for `new_state`, closing
    /// the existing active session first if one exists.
    StartNew { new_state: ActivityState },
    /// Caller must close the existing active session.
    EndActive,
    /// Invalid or meaningless transition; caller rejects.
    NoChange,
}

/// Pure decision table (§4.1). `active` is the state of the user's current
/// active session, or `None` if idle.
#[must_use]
pub fn decide(active: Option<ActivityState>, requested: ActivityState) -> ToggleOutcome {
    match active {
        None => ToggleOutcome::StartNew {
            new_state: requested,
        },
        Some(current) if current == requested => ToggleOutcome::EndActive,
        Some(_) => ToggleOutcome::StartNew {
            new_state: requested,
        },
    }
}
