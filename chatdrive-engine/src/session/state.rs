use chatdrive_core::FolderId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Uninitialized,
    Connecting,
    Connected,
    LoggedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    CredentialsMissing,
    CredentialsLoaded,
    ConnectSucceeded,
    /// The user asked to retry a failed connect; startup begins again.
    Retry,
    Abandoned,
    Logout,
}

impl SessionPhase {
    /// Next phase for `event`, or `None` when the event does not apply.
    pub fn transition(self, event: SessionEvent) -> Option<SessionPhase> {
        use SessionEvent as E;
        use SessionPhase as P;

        match (self, event) {
            (_, E::Logout) => Some(P::LoggedOut),
            (P::Uninitialized, E::CredentialsMissing) => Some(P::LoggedOut),
            (P::Uninitialized, E::CredentialsLoaded) => Some(P::Connecting),
            (P::Connecting, E::ConnectSucceeded) => Some(P::Connected),
            (P::Connecting, E::Retry) => Some(P::Uninitialized),
            (P::Connecting, E::Abandoned) => Some(P::LoggedOut),
            _ => None,
        }
    }
}

/// Observable session snapshot.
///
/// `connected` is advisory: only the network probe and a successful connect
/// move it, and nothing gates on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub connected: bool,
    pub active_folder: FolderId,
    pub credentials_present: bool,
    pub syncing: bool,
}
