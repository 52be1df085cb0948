//! Telnet option negotiation.
//!
//! [`TelnetParser`] separates inline IAC control sequences from the data
//! stream; [`respond`] holds the fixed reply policy. Negotiation never
//! reaches the text layer.

use bytes::{BufMut, Bytes, BytesMut};
use memchr::memchr;

/// Interpret As Command.
pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
/// Subnegotiation begin.
pub const SB: u8 = 250;
/// Subnegotiation end.
pub const SE: u8 = 240;

/// Option code for remote echo.
pub const ECHO: u8 = 1;

/// One unit of parsed Telnet input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelnetEvent {
    /// Plain data bytes.
    Data(Bytes),

    /// An option negotiation command: one of WILL, WONT, DO, DONT.
    Negotiate { command: u8, option: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Data,
    Iac,
    Negotiate(u8),
    Subnegotiation,
    SubnegotiationIac,
}

/// Incremental Telnet stream parser.
///
/// Keeps its state between calls, so a command split across two reads is
/// still recognized.
#[derive(Debug, Default)]
pub struct TelnetParser {
    state: State,
}

impl TelnetParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the next slice of raw input.
    ///
    /// Escaped `IAC IAC` becomes a literal 0xFF data byte. Subnegotiation
    /// blocks and two-byte commands (NOP, GA, ...) are dropped.
    pub fn feed(&mut self, mut input: &[u8]) -> Vec<TelnetEvent> {
        let mut events = Vec::new();
        let mut data = BytesMut::with_capacity(input.len());

        while let Some((&byte, rest)) = input.split_first() {
            match self.state {
                State::Data => match memchr(IAC, input) {
                    Some(pos) => {
                        data.extend_from_slice(&input[..pos]);
                        input = &input[pos + 1..];
                        self.state = State::Iac;
                    }
                    None => {
                        data.extend_from_slice(input);
                        input = &[];
                    }
                },
                State::Iac => {
                    input = rest;
                    self.state = match byte {
                        IAC => {
                            data.put_u8(IAC);
                            State::Data
                        }
                        WILL | WONT | DO | DONT => State::Negotiate(byte),
                        SB => State::Subnegotiation,
                        _ => State::Data,
                    };
                }
                State::Negotiate(command) => {
                    input = rest;
                    if !data.is_empty() {
                        events.push(TelnetEvent::Data(data.split().freeze()));
                    }
                    events.push(TelnetEvent::Negotiate {
                        command,
                        option: byte,
                    });
                    self.state = State::Data;
                }
                State::Subnegotiation => match memchr(IAC, input) {
                    Some(pos) => {
                        input = &input[pos + 1..];
                        self.state = State::SubnegotiationIac;
                    }
                    None => input = &[],
                },
                State::SubnegotiationIac => {
                    input = rest;
                    self.state = if byte == SE {
                        State::Data
                    } else {
                        State::Subnegotiation
                    };
                }
            }
        }

        if !data.is_empty() {
            events.push(TelnetEvent::Data(data.freeze()));
        }
        events
    }
}

/// The reply to a negotiation command, if any.
///
/// The device is always asked to echo. Every other option is refused:
/// DO/DONT gets WONT, WILL/WONT gets DONT.
pub fn respond(command: u8, option: u8) -> Option<[u8; 3]> {
    match command {
        WILL | WONT | DO | DONT if option == ECHO => Some([IAC, DO, ECHO]),
        DO | DONT => Some([IAC, WONT, option]),
        WILL | WONT => Some([IAC, DONT, option]),
        _ => None,
    }
}
