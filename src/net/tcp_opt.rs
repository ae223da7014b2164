use std::io;
use std::net::SocketAddr;

use mio::net::TcpStream;
use socket2::{Domain, Protocol, Socket, Type};

const LISTEN_BACKLOG: i32 = 1024;

/// Sets latency flags on an accepted connection.
///
/// # Optimizations
/// * `TCP_NODELAY` (Disable Nagle's Algorithm): small frames such as Pong and
///   Close go out immediately instead of waiting to coalesce.
pub fn apply_optimizations(stream: &TcpStream) -> io::Result<()> {
    stream.set_nodelay(true)
}

/// Creates a non-blocking listening socket bound to `addr`.
///
/// Returns a `socket2::Socket` which can be converted to `std::net::TcpListener`.
pub fn create_listener(addr: SocketAddr) -> io::Result<Socket> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;

    // Quick restarts of the server must not trip over TIME_WAIT.
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.set_nodelay(true)?;

    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    Ok(socket)
}
