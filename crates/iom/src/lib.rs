//! Object mapping for the Icinga 2 API.
//!
//! A [`Session`] resolves type names through the server's own schema and
//! hands out [`ObjectSet`]s and [`MappedObject`]s backed by cached queries.
//! Fields come back as typed values; containers and nested objects send
//! changes as partial updates of exactly the element that changed.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use icinga2_api::{CacheDuration, Transport};
//! # use icinga2_iom::{ModifyOptions, Session};
//! # fn demo(transport: Arc<dyn Transport>) -> Result<(), icinga2_api::ApiError> {
//! let session = Session::new(transport, CacheDuration::from_secs(60));
//! let host = session.object("Host", "web-01")?;
//! if let Some(vars) = host.get_field("vars")?.as_dictionary() {
//!     vars.set("disks.root.warn", "15%")?;
//! }
//! host.modify(serde_json::json!({"address": "10.0.0.5"}), ModifyOptions::default())?;
//! # Ok(())
//! # }
//! ```

pub mod filter;
pub mod objects;
pub mod session;
pub mod types;
pub mod values;

pub use filter::objects_filter;
pub use objects::{
    DeleteOptions, FieldValue, MappedObject, ModifyOptions, ObjectSet, OperationReport,
    ParentDescriptor,
};
pub use session::{Mapped, Session};
pub use types::{
    BaseKind, Capabilities, FieldDesc, Form, ObjectClass, TypeClass, TypeEntry, TypeRegistry,
    ValueKind,
};
pub use values::{ArrayValue, Batch, DictionaryValue, Scalar};
