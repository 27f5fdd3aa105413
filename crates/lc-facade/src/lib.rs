//! Platform Facade (SPEC_FULL §4.10): the only crate that touches the
//! filesystem directly. Loads scene and index files, constructs Core
//! Service requests, and drives the session lifecycle through
//! [`session::SessionManager`].

pub mod context;
pub mod core_client;
pub mod indexes;
pub mod repo_preflight;
pub mod scenes;
pub mod session;

pub use core_client::{CoreClient, HttpCoreClient, InProcessCoreClient};
pub use session::{IndexContextCheck, NewSessionReport, SceneChangeReport, SessionManager};
