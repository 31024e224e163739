//! HTTP Basic authentication for tonic services.
//!
//! Enforces a shared username/password pair at the middleware seam, without
//! touching service handler code:
//!
//! - [`BasicAuthLayer`] (server side): a tower layer that verifies the
//!   `authorization` metadata of every inbound call and terminates
//!   unauthenticated calls with [`tonic::Code::Unauthenticated`]. Individual
//!   methods can be exempted with [`with_skipped_methods`].
//! - [`BasicAuthInterceptor`] (client side): a request interceptor that
//!   attaches `authorization: basic <base64(user:pass)>` to every outgoing
//!   call. There is no client-side skip list.
//!
//! Credentials are compared in constant time, and the rejection message
//! never says which half of the pair was wrong. Constructing either side
//! with an empty username *and* password disables authentication entirely:
//! every call passes and no header is attached.
//!
//! # Server
//!
//! ```rust,no_run
//! use tonic::transport::Server;
//! use tonic_basic_auth::{with_skipped_methods, BasicAuthLayer};
//!
//! let layer = BasicAuthLayer::new(
//!     "admin",
//!     "secret",
//!     [with_skipped_methods(["/grpc.health.v1.Health/Check"])],
//! );
//!
//! let builder = Server::builder().layer(layer);
//! // builder.add_service(GreeterServer::new(MyGreeter::default()))
//! //     .serve(addr)
//! //     .await?;
//! ```
//!
//! # Client
//!
//! ```rust,no_run
//! use tonic_basic_auth::BasicAuthInterceptor;
//!
//! # async fn connect() -> Result<(), Box<dyn std::error::Error>> {
//! let channel = tonic::transport::Channel::from_static("http://127.0.0.1:50051")
//!     .connect()
//!     .await?;
//! let auth = BasicAuthInterceptor::new("admin", "secret", []);
//! // let mut client = GreeterClient::with_interceptor(channel, auth);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod server;

pub use client::BasicAuthInterceptor;
pub use config::{with_scheme, with_skipped_methods, BasicAuthConfig, BasicAuthOption};
pub use error::{AuthError, ExtractionError};
pub use server::{BasicAuth, BasicAuthLayer};
