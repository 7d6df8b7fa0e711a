//! Drives offline-signed storage uploads to completion.
//!
//! In offline-sign mode a storage node never holds the client's key. Each
//! time an upload session needs a signature it parks at a `*SignReady`
//! stage and waits. A [`SessionDriver`] polls the session on a fixed
//! interval, signs whatever that stage asks for with a local [`Signer`] and
//! submits it, until the session reaches `complete` or `error`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use offsign::{Ed25519Signer, RemoteSession, SessionDriver, Supervisor};
//! use offsign_runtime::Shell;
//!
//! let shell = Shell::new("http://localhost:5001")?;
//! let session = shell.storage_upload_offline(&content).await?;
//! let remote = Arc::new(RemoteSession::new(shell, Ed25519Signer::generate()));
//!
//! let handle = SessionDriver::new(remote).start(session.clone(), content);
//! let outcome = Supervisor::default()
//!     .supervise(handle, |event| println!("{event:?}"))
//!     .await?;
//! outcome.into_result(&session)?;
//! ```

pub mod dispatch;
pub mod driver;
pub mod error;
pub mod session;
pub mod signing;
pub mod supervisor;
#[cfg(feature = "testing")]
pub mod testing;

pub use dispatch::{Performed, StageAction, classify};
pub use driver::{
	DEFAULT_POLL_INTERVAL, DriverConfig, Report, SessionControl, SessionDriver, SessionHandle,
	SessionOutcome,
};
pub use error::{Error, Result};
pub use offsign_protocol::{
	BatchContracts, ContentId, ContractItem, Opcode, SessionId, Stage, UnsignedPayload,
};
pub use session::{RemoteSession, UploadSession};
pub use signing::{Ed25519Signer, SignatureKind, Signer, pay_channel_message};
pub use supervisor::{DEFAULT_SILENCE_TIMEOUT, Supervisor, SupervisorConfig, SupervisorEvent};
