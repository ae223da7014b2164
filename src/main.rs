use std::io::ErrorKind;
use std::net::TcpListener as StdListener;

use mio::event::Event;
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};

use ws_framing::config::Config;
use ws_framing::error::ServerError;
use ws_framing::net::server::Connections;
use ws_framing::net::session::Session;
use ws_framing::net::tcp_opt;

// Token for the listening socket in the MIO poll
const LISTENER: Token = Token(0);

fn main() {
    if let Err(err) = run() {
        eprintln!("ws_echo: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<(), ServerError> {
    let config = Config::from_env()?;

    println!(
        "Starting raw-frame echo server on {} (max payload: {} bytes)...",
        config.bind_addr, config.max_payload
    );

    let socket = tcp_opt::create_listener(config.bind_addr)?;
    let std_listener: StdListener = socket.into();
    let mut listener = TcpListener::from_std(std_listener);

    let mut poll = Poll::new()?;
    let mut events = Events::with_capacity(128);
    poll.registry()
        .register(&mut listener, LISTENER, Interest::READABLE)?;

    let mut connections = Connections::new();

    loop {
        // Only a failing poll ends the server; everything below is per connection.
        if let Err(e) = poll.poll(&mut events, None) {
            if e.kind() == ErrorKind::Interrupted {
                continue;
            }
            return Err(e.into());
        }

        for event in &events {
            match event.token() {
                LISTENER => loop {
                    match listener.accept() {
                        Ok((stream, peer)) => {
                            match connections.admit(poll.registry(), stream, &config) {
                                Ok(token) => println!("Accepted {} as {:?}", peer, token),
                                Err(e) => eprintln!("Dropping {}: {}", peer, e),
                            }
                        }
                        Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                        Err(ref e)
                            if matches!(
                                e.kind(),
                                ErrorKind::Interrupted | ErrorKind::ConnectionAborted
                            ) =>
                        {
                            continue
                        }
                        Err(e) => {
                            // EMFILE / ENFILE: retry on the next listener event.
                            eprintln!("Accept error: {}", e);
                            break;
                        }
                    }
                },
                token => {
                    let done = match connections.get_mut(token) {
                        Some(session) => service(session, event),
                        None => continue,
                    };
                    if done {
                        if let Err(e) = connections.remove(poll.registry(), token) {
                            eprintln!("Deregister error on {:?}: {}", token, e);
                        }
                        println!("Closed {:?} ({} open)", token, connections.len());
                    }
                }
            }
        }
    }
}

/// Handles one readiness event. Returns `true` when the connection is over.
fn service(session: &mut Session, event: &Event) -> bool {
    if event.is_readable() {
        if let Err(e) = session.read_ready() {
            eprintln!("Read error: {}", e);
            return true;
        }
    }

    if event.is_writable() || session.wants_write() {
        if let Err(e) = session.write() {
            eprintln!("Write error: {}", e);
            return true;
        }
    }

    session.is_finished()
}
