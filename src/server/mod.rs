//! The server side: per-connection state machine, response shapes,
//! routing and the single-threaded accept/serve loop.

mod answer;
pub use answer::{Answer, CaptureAnswer, CodeAnswer, FileAnswer, HeaderAnswer, SimpleAnswer};

mod client;
pub use client::{Client, ClientState, Status};

mod forms;
pub use forms::FormPost;

mod route;
pub use route::{Handler, Route, Router};

mod run;
pub use run::Server;
