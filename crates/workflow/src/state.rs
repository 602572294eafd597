//! The workflow view state machine.
//!
//! [`View::transition`] is the only way to move between views; every pair of view and event
//! that is not listed there is rejected with [`InvalidTransition`].

use crate::error::Failure;

/// Which step of the journey is active.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum View {
    /// Waiting for the user to log in with Google.
    #[default]
    SignIn,
    /// The login redirect came back and is being read.
    HandlingRedirect,
    /// Looking up the PKPs bound to the identity token.
    Fetching,
    /// PKPs fetched; the user picks one or mints a new one.
    Fetched,
    Minting,
    Minted,
    CreatingSession,
    /// A signing session is active.
    SessionCreated,
    /// A primary flow failed.
    Error {
        failure: Failure,
        /// Where acknowledging the error leads.
        resume: Resume,
    },
}

/// The stable views an error can fall back to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resume {
    SignIn,
    Fetched,
    SessionCreated,
}

impl From<Resume> for View {
    fn from(resume: Resume) -> Self {
        match resume {
            Resume::SignIn => Self::SignIn,
            Resume::Fetched => Self::Fetched,
            Resume::SessionCreated => Self::SessionCreated,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    CallbackDetected,
    TokenExtracted,
    PkpsFetched,
    MintRequested,
    Minted,
    SessionRequested,
    SessionEstablished,
    Failed(Failure),
    Acknowledge,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CallbackDetected => "callback detected",
            Self::TokenExtracted => "token extracted",
            Self::PkpsFetched => "pkps fetched",
            Self::MintRequested => "mint requested",
            Self::Minted => "minted",
            Self::SessionRequested => "session requested",
            Self::SessionEstablished => "session established",
            Self::Failed(_) => "failed",
            Self::Acknowledge => "acknowledge",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("cannot handle `{event}` while in `{view}`")]
pub struct InvalidTransition {
    pub view: &'static str,
    pub event: &'static str,
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SignIn => "sign in",
            Self::HandlingRedirect => "handling redirect",
            Self::Fetching => "fetching",
            Self::Fetched => "fetched",
            Self::Minting => "minting",
            Self::Minted => "minted",
            Self::CreatingSession => "creating session",
            Self::SessionCreated => "session created",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The view an error raised from here falls back to.
    ///
    /// A token exists from `Fetching` on and a session only in `SessionCreated`.
    fn resume_point(&self) -> Resume {
        match self {
            Self::SignIn | Self::HandlingRedirect | Self::Error { .. } => Resume::SignIn,
            Self::Fetching
            | Self::Fetched
            | Self::Minting
            | Self::Minted
            | Self::CreatingSession => Resume::Fetched,
            Self::SessionCreated => Resume::SessionCreated,
        }
    }

    /// Applies `event`, returning the next view.
    pub fn transition(&self, event: Event) -> Result<Self, InvalidTransition> {
        let next = match (self, event) {
            (Self::SignIn, Event::CallbackDetected) => Self::HandlingRedirect,
            (Self::HandlingRedirect, Event::TokenExtracted) => Self::Fetching,
            (Self::Fetching, Event::PkpsFetched) => Self::Fetched,
            (Self::Fetched, Event::MintRequested) => Self::Minting,
            (Self::Minting, Event::Minted) => Self::Minted,
            (Self::Fetched | Self::Minted, Event::SessionRequested) => Self::CreatingSession,
            (Self::CreatingSession, Event::SessionEstablished) => Self::SessionCreated,
            (Self::Error { resume, .. }, Event::Acknowledge) => (*resume).into(),
            (Self::Error { .. }, event @ Event::Failed(_)) => {
                return Err(self.invalid(&event));
            }
            (view, Event::Failed(failure)) => {
                Self::Error { failure, resume: view.resume_point() }
            }
            (_, event) => return Err(self.invalid(&event)),
        };
        Ok(next)
    }

    fn invalid(&self, event: &Event) -> InvalidTransition {
        InvalidTransition { view: self.name(), event: event.name() }
    }
}

/// Proof that a transition was started by [`Machine::begin`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub struct Ticket {
    generation: u64,
}

/// Outcome of [`Machine::complete`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// Another transition happened since the ticket was issued; nothing was changed.
    Stale,
}

/// A [`View`] plus a generation counter that is bumped by every applied event.
///
/// An asynchronous action calls [`begin`](Self::begin) before awaiting and
/// [`complete`](Self::complete) with the result. If anything moved the machine in between, the
/// late result is discarded instead of overwriting the newer state.
#[derive(Clone, Debug, Default)]
pub struct Machine {
    view: View,
    generation: u64,
}

impl Machine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// Applies `event` immediately.
    pub fn apply(&mut self, event: Event) -> Result<(), InvalidTransition> {
        let next = self.view.transition(event)?;
        trace!(target: "workflow", from = self.view.name(), to = next.name(), "transition");
        self.view = next;
        self.generation += 1;
        Ok(())
    }

    /// Applies `event` and returns a ticket for the outcome of the work it starts.
    pub fn begin(&mut self, event: Event) -> Result<Ticket, InvalidTransition> {
        self.apply(event)?;
        Ok(Ticket { generation: self.generation })
    }

    /// Applies `event` if `ticket` is still current.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        event: Event,
    ) -> Result<Completion, InvalidTransition> {
        if ticket.generation != self.generation {
            debug!(target: "workflow", event = event.name(), "discarding stale completion");
            return Ok(Completion::Stale);
        }
        self.apply(event)?;
        Ok(Completion::Applied)
    }
}
