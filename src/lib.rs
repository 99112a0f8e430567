//! # genkan
//!
//! Typed, immutable server requests from CGI-style gateway environments.
//! Nothing more. Nothing less.
//!
//! ## The contract
//!
//! The gateway handles the wire. genkan does not — by design. By the time a
//! CGI, FastCGI, or embedded SAPI-style host hands a request over, the hard
//! transport work is done and flattened into environment-shaped state.
//! Redoing it in-process would only add a second, disagreeing parser.
//!
//! What the gateway already owns — genkan intentionally ignores:
//!
//! - **Sockets and TLS** — the host accepted the connection
//! - **HTTP parsing** — the request line and headers arrive as variables
//! - **Multipart decoding** — uploads are already files on disk
//! - **Routing and dispatch** — that is the application's business
//!
//! What's left for genkan — the boundary between ambient state and typed
//! code:
//!
//! - Environment derivations — method, URI, protocol, and headers from
//!   CGI-style variables, as total functions with documented defaults
//! - One immutable [`ServerRequest`] value — every change is a cheap
//!   copy-on-write, never a mutation
//! - Uploaded files as single-use resources — stream once or move once,
//!   through any clone, never twice
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use genkan::Env;
//!
//! fn main() {
//!     let request = Env::new().capture().unwrap();
//!
//!     println!("content-type: text/plain");
//!     println!();
//!     println!("{} {}", request.method(), request.request_target());
//!     for (name, value) in request.query_params() {
//!         println!("query {name} = {value}");
//!     }
//! }
//! ```

mod env;
mod error;
pub mod files;
pub mod gateway;
mod request;
mod stream;
mod upload_error;
mod uploaded_file;

pub use env::{Env, parse_cookie_header, parse_query_string};
pub use error::{Error, ErrorKind};
pub use files::{RawFile, RawUpload, UploadFiles, UploadNode};
pub use gateway::Params;
pub use request::{ServerRequest, ServerRequestBuilder};
pub use stream::UploadStream;
pub use upload_error::UploadError;
pub use uploaded_file::UploadedFile;
