//! Provernet Request SDK
//!
//! Client library for submitting execution requests to the Provernet prover
//! network. A request names a registered computation image, carries its
//! input and a prover tip, and is anchored in a freshly allocated ledger
//! account that the network's request program owns from the moment the
//! submission transaction confirms. The SDK then watches that account until
//! a prover claims it, the request expires, or the caller stops waiting.
//!
//! The ledger itself is a collaborator: implement [`ledger::Ledger`] over
//! your RPC connection and hand it in. Nothing here holds global state.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use provernet_sdk::prelude::*;
//!
//! async fn request_hello(
//!     ledger: Arc<dyn Ledger>,
//!     program: Address,
//!     payer: SigningIdentity,
//! ) -> Result<(), SessionError> {
//!     let image = ImageId::from_hex(
//!         "7f8ebdabe3ed69b8d47b2cbc86e8668d171e1a0ced01610fd1ecc224db69767b",
//!     )?;
//!
//!     let session = RequestSession::new(ledger, program, payer, ClientConfig::default());
//!     let outcome = session
//!         .run(
//!             &image,
//!             InputPayload::Inline(b"Hello, World!".to_vec()),
//!             SessionParams { tip: 12_000, expiry_offset: 2_000, callback_program: program },
//!             None,
//!         )
//!         .await?;
//!
//!     println!("submitted {}: {:?}", outcome.signature, outcome.resolution);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod image;
pub mod ledger;
pub mod request;
pub mod retry;
pub mod session;
pub mod submit;
pub mod testing;
pub mod watch;

pub use config::ClientConfig;
pub use error::{Phase, SessionError};
pub use image::{locate, locate_verified, ImageAddress, ImageId, LocateError};
pub use ledger::{
    derive_address, AccountInfo, Address, ConfirmStatus, Instruction, Ledger, LedgerError,
    Signature, SigningIdentity, Slot, Transaction,
};
pub use request::{
    BuildError, ExecutionRequest, ExecutionRequestBuilder, InputPayload, RequestRecord,
};
pub use session::{RequestOutcome, RequestSession, Resolution, SessionParams};
pub use submit::{Confirmation, RequestSubmitter, SubmitError};
pub use watch::{
    cancellation, CancelHandle, CancelSignal, ClaimObservation, ClaimState, ClaimWatcher,
    WatchError,
};

/// Everything most callers need.
pub mod prelude {
    pub use crate::config::ClientConfig;
    pub use crate::error::{Phase, SessionError};
    pub use crate::image::{ImageAddress, ImageId};
    pub use crate::ledger::{Address, Ledger, Signature, SigningIdentity};
    pub use crate::request::{ExecutionRequestBuilder, InputPayload};
    pub use crate::session::{RequestOutcome, RequestSession, Resolution, SessionParams};
    pub use crate::watch::{cancellation, CancelHandle, CancelSignal, ClaimObservation};
}
