//! Text replies echoed back to a connected peer

use bytes::{BufMut, BytesMut};

/// One line-oriented reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Parsed arguments of a frame
    Arguments(Vec<i32>),

    /// Payload was cut to `kept` bytes
    Truncated { kept: usize },

    /// Tokens beyond the argument capacity were dropped
    Discarded { count: usize },

    /// Oversized frames dropped under the reject policy
    Rejected { count: usize },
}

impl Reply {
    pub fn arguments(args: &[i32]) -> Self {
        Reply::Arguments(args.to_vec())
    }

    /// Encode the reply to bytes
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf);
        buf
    }

    /// Encode the reply into an existing buffer
    pub fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            Reply::Arguments(args) => {
                buf.put_slice(b"Current number of args: ");
                buf.put_slice(args.len().to_string().as_bytes());
                buf.put_slice(b"\r\n");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        buf.put_u8(b' ');
                    }
                    buf.put_slice(arg.to_string().as_bytes());
                }
                buf.put_slice(b"\r\n");
            }
            Reply::Truncated { kept } => {
                buf.put_slice(b"-WARN TRUNCATED payload cut to ");
                buf.put_slice(kept.to_string().as_bytes());
                buf.put_slice(b" bytes\r\n");
            }
            Reply::Discarded { count } => {
                buf.put_slice(b"-WARN DISCARDED ");
                buf.put_slice(count.to_string().as_bytes());
                buf.put_slice(b" extra arguments\r\n");
            }
            Reply::Rejected { count } => {
                buf.put_slice(b"-ERR OVERFLOW ");
                buf.put_slice(count.to_string().as_bytes());
                buf.put_slice(b" frame(s) rejected\r\n");
            }
        }
    }
}
