//! Diagnostic responder
//!
//! Replies to vendor control requests from the host:
//! - `c` - Current reading as little-endian `u16`, followed by the motor direction code since the
//!   previous `c` request. Reading the direction clears it.
//! - `h` - `Hello` (bring-up mode only)
//!
//! Anything else gets an empty reply in production mode and [`ERROR_TOKEN`] in bring-up mode.

use heapless::Vec;
use static_assertions::const_assert;

use crate::{config::ReplyMode, controller::MotorDirection, thermometer::Reading};

pub const READ_REQUEST: u8 = b'c';
pub const HELLO_REQUEST: u8 = b'h';

pub const HELLO: &[u8] = b"Hello";
pub const ERROR_TOKEN: &[u8] = b"Err!";

/// Reading (2 bytes) + direction code (1 byte)
pub const READING_REPLY_LEN: usize = 3;
pub const REPLY_SIZE: usize = 8;

const_assert!(REPLY_SIZE >= READING_REPLY_LEN);
const_assert!(REPLY_SIZE >= 5);

pub type Reply = Vec<u8, REPLY_SIZE>;

/// State exposed to the host.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Diagnostics {
    reading: Reading,
    direction: MotorDirection,
    mode: ReplyMode,
}

impl Diagnostics {
    pub const fn new(mode: ReplyMode) -> Self {
        Self {
            reading: Reading::NONE,
            direction: MotorDirection::Idle,
            mode,
        }
    }

    /// Replace the published reading. Timeouts are published as well so the host can tell a dead
    /// sensor from a stale value.
    pub fn publish(&mut self, reading: Reading) {
        self.reading = reading;
    }

    /// Remember a motor move until the host asks for it. Idle decisions don't erase a move the
    /// host has not seen yet.
    pub fn record(&mut self, direction: MotorDirection) {
        if direction != MotorDirection::Idle {
            self.direction = direction;
        }
    }

    pub const fn reading(&self) -> Reading {
        self.reading
    }

    pub const fn direction(&self) -> MotorDirection {
        self.direction
    }

    /// Build the reply for a vendor request code.
    #[cfg_attr(feature = "sizing", inline(never))]
    pub fn respond(&mut self, request: u8) -> Reply {
        let mut reply = Reply::new();

        let body: &[u8] = match (request, self.mode) {
            (READ_REQUEST, _) => {
                let [lo, hi] = self.reading.to_le_bytes();
                let direction = core::mem::take(&mut self.direction);
                trace!("read request: {}, {}", self.reading, direction);
                return Reply::from_slice(&[lo, hi, direction.code()]).unwrap_or(reply);
            }
            (HELLO_REQUEST, ReplyMode::BringUp) => HELLO,
            (_, ReplyMode::BringUp) => ERROR_TOKEN,
            (_, ReplyMode::Production) => &[],
        };

        debug!("request {=u8:#x}: {=usize} byte reply", request, body.len());
        // REPLY_SIZE covers every canned body
        let _ = reply.extend_from_slice(body);
        reply
    }
}
