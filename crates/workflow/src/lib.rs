//! # litsafe-workflow
//!
//! The controller behind the "sign in with Google, get a PKP, co-sign a Safe" journey.
//!
//! [`Workflow`] owns the collaborators (relay, signing network, transaction submitter) and a
//! [`Machine`] holding the current [`View`]. Front-ends call its actions and render the view.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod controller;
pub mod error;
pub mod state;
pub mod submit;

pub use controller::{
    ActiveSession, CosignOutcome, CosignRequest, CosignState, SAFE_THRESHOLD, SignedMessage,
    Workflow,
};
pub use error::{ErrorKind, Failure, WorkflowError};
pub use state::{Completion, Event, InvalidTransition, Machine, Resume, Ticket, View};
pub use submit::{RpcSubmitter, SubmitError, TransactionSubmitter};
