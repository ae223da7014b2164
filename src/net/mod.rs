pub mod framing;
pub mod server;
pub mod session;
pub mod tcp_opt;
