//! Lodestar core: read-only snapshot primitives.
//!
//! Every read operation runs the same pipeline:
//! `QueryBuilder -> RemoteClient -> ResultClassifier -> Flattener -> IdentityAssigner -> FieldCommitter`.
//! This crate holds everything in that pipeline except the remote call itself.

#![forbid(unsafe_code)]

pub mod classify;
pub mod commit;
pub mod error;
pub mod flatten;
pub mod identity;
pub mod model;
pub mod query;
pub mod record;
pub mod schema;

pub use classify::{MessageRule, NotFoundRule, Outcome, ResultClassifier, StatusOrMessageRule};
pub use commit::{FieldCommitter, ResourceState, StateSink};
pub use error::{OpContext, ReadError, RemoteError, SinkError};
pub use flatten::{Flatten, FlattenOptions, TimestampStyle};
pub use identity::{Identity, IdentityAssigner, IdentityRule};
pub use query::{FilterValue, Query, QueryBuilder, VolumeType, DEFAULT_NAMESPACE};
pub use record::{FieldValue, ResourceRecord};
pub use schema::{FieldSpec, Filter, ResourceKind, Shape};

pub mod prelude {
    pub use super::{
        FieldCommitter, FieldValue, Flatten, FlattenOptions, Identity, IdentityAssigner, IdentityRule, OpContext,
        Outcome, Query, QueryBuilder, ReadError, RemoteError, ResourceKind, ResourceRecord, ResourceState,
        ResultClassifier, SinkError, StateSink,
    };
}
