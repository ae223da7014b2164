use std::collections::HashMap;
use std::io;

use mio::net::TcpStream;
use mio::{Registry, Token};

use crate::config::Config;
use crate::net::session::Session;
use crate::net::tcp_opt;

/// Token 0 belongs to the listener.
const FIRST_SESSION: usize = 1;

/// Open sessions keyed by their poll token.
///
/// Every failure here belongs to a single connection: the stream involved is
/// dropped and the other sessions are left alone.
pub struct Connections {
    sessions: HashMap<Token, Session>,
    next_token: usize,
}

impl Default for Connections {
    fn default() -> Self {
        Self::new()
    }
}

impl Connections {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            next_token: FIRST_SESSION,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get_mut(&mut self, token: Token) -> Option<&mut Session> {
        self.sessions.get_mut(&token)
    }

    /// Tunes and registers a freshly accepted stream. On error the stream is
    /// dropped and the table is unchanged.
    pub fn admit(
        &mut self,
        registry: &Registry,
        stream: TcpStream,
        config: &Config,
    ) -> io::Result<Token> {
        tcp_opt::apply_optimizations(&stream)?;

        let token = self.allocate_token();
        let mut session = Session::new(stream, config.codec(), config.read_buffer);
        session.register(registry, token)?;
        self.sessions.insert(token, session);
        Ok(token)
    }

    /// Drops the session for `token`. The socket is closed even when
    /// deregistration fails; the error is handed back for logging.
    pub fn remove(&mut self, registry: &Registry, token: Token) -> io::Result<()> {
        match self.sessions.remove(&token) {
            Some(mut session) => session.deregister(registry),
            None => Ok(()),
        }
    }

    fn allocate_token(&mut self) -> Token {
        loop {
            let token = Token(self.next_token);
            self.next_token = self.next_token.wrapping_add(1).max(FIRST_SESSION);
            if !self.sessions.contains_key(&token) {
                return token;
            }
        }
    }
}
