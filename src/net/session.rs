use std::io::{self, ErrorKind, Read, Write};
use std::mem;

use bytes::Bytes;
use log::{debug, warn};
use mio::net::TcpStream;
use mio::{Interest, Registry, Token};

use crate::error::{FrameError, ServerError};
use crate::net::framing::{
    encode_close, encode_frame, ControlFrame, Decoded, EncodedFrame, FrameCodec, Opcode,
};

/// One accepted connection: its socket, its own codec and the bytes still
/// waiting to be written. State is owned by the struct, never shared.
pub struct Session {
    pub stream: TcpStream,
    pub codec: FrameCodec,
    outbox: Vec<u8>,
    read_buf: Vec<u8>,
    closing: bool,
}

impl Session {
    pub fn new(stream: TcpStream, codec: FrameCodec, read_buffer: usize) -> Self {
        Self {
            stream,
            codec,
            outbox: Vec::new(),
            read_buf: vec![0u8; read_buffer],
            closing: false,
        }
    }

    pub fn register(&mut self, registry: &Registry, token: Token) -> io::Result<()> {
        registry.register(&mut self.stream, token, Interest::READABLE | Interest::WRITABLE)
    }

    pub fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        registry.deregister(&mut self.stream)
    }

    pub fn wants_write(&self) -> bool {
        !self.outbox.is_empty()
    }

    /// Nothing more will be read: a Close is queued or the peer hung up.
    pub fn is_closing(&self) -> bool {
        self.closing
    }

    /// Done once the replies queued before closing are flushed.
    pub fn is_finished(&self) -> bool {
        self.closing && self.outbox.is_empty()
    }

    /// Drains the socket into the codec until it would block.
    ///
    /// A hang-up marks the session closing; replies already queued still go
    /// out before [`Session::is_finished`] reports true.
    pub fn read_ready(&mut self) -> Result<(), ServerError> {
        let mut buf = mem::take(&mut self.read_buf);
        let result = self.read_into(&mut buf);
        self.read_buf = buf;
        result
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), ServerError> {
        while !self.closing {
            match self.stream.read(buf) {
                Ok(0) => {
                    debug!("peer hung up, {} bytes left to flush", self.outbox.len());
                    self.closing = true;
                }
                Ok(n) => self.feed(&buf[..n])?,
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Runs a chunk through the codec and queues the replies.
    ///
    /// A protocol violation queues a Close carrying the matching status and
    /// stops reading; the caller tears the connection down after the flush.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), ServerError> {
        let mut next = self.codec.decode(chunk);
        loop {
            match next {
                Ok(Decoded::Incomplete) => return Ok(()),
                Ok(Decoded::Message(message)) => {
                    debug!("echo {:?} message of {} bytes", message.opcode, message.payload.len());
                    let frame = encode_frame(message.opcode, message.payload)?;
                    self.queue(&frame);
                }
                Ok(Decoded::Control(control)) => {
                    self.on_control(control)?;
                    if self.closing {
                        return Ok(());
                    }
                }
                Err(err) => {
                    self.fail(&err)?;
                    return Ok(());
                }
            }
            next = self.codec.decode(&[]);
        }
    }

    fn on_control(&mut self, control: ControlFrame) -> Result<(), FrameError> {
        match control.opcode {
            Opcode::Ping => {
                let pong = encode_frame(Opcode::Pong, control.payload)?;
                self.queue(&pong);
            }
            Opcode::Close => {
                let close = match control.close_code() {
                    Some(code) => {
                        debug!("peer sent close {}", code);
                        encode_close(code, "")?
                    }
                    None => encode_frame(Opcode::Close, Bytes::new())?,
                };
                self.queue(&close);
                self.closing = true;
            }
            _ => {}
        }
        Ok(())
    }

    fn fail(&mut self, err: &FrameError) -> Result<(), FrameError> {
        warn!("closing connection: {}", err);
        let close = encode_close(err.close_code(), "")?;
        self.queue(&close);
        self.closing = true;
        Ok(())
    }

    pub fn queue(&mut self, frame: &EncodedFrame) {
        for part in frame.parts() {
            self.outbox.extend_from_slice(part);
        }
    }

    /// Pushes queued bytes to the socket until it would block.
    pub fn write(&mut self) -> io::Result<()> {
        while !self.outbox.is_empty() {
            match self.stream.write(&self.outbox) {
                Ok(0) => return Err(io::Error::new(ErrorKind::WriteZero, "socket closed")),
                Ok(n) => {
                    self.outbox.drain(..n);
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn pending_output(&self) -> &[u8] {
        &self.outbox
    }
}
