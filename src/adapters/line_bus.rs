//! Line-oriented bus adapter.
//!
//! Speaks the `mosquitto_sub -v` output format: one message per line,
//! topic and payload separated by the first space.
//!
//! ```text
//!   mosquitto_sub -v -t '#' | edgewatch run | while read t p; do mosquitto_pub -t "$t" -m "$p"; done
//! ```
//!
//! Inbound lines are read on a dedicated thread and pushed into the
//! bounded ingress queue; publishes are written to any [`Write`] sink.
//! QoS and retain cannot be expressed in this format and are dropped.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::SyncSender;

use log::{debug, trace};

use crate::app::inbound::InboundMessage;
use crate::app::ports::BusPort;
use crate::error::BusError;

/// MQTT topic filter match, supporting `+` and `#` wildcards.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut f = filter.split('/');
    let mut t = topic.split('/');
    loop {
        match (f.next(), t.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(a), Some(b)) if a == b => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Split `<topic> <payload>`.  Lines without a topic are rejected; a
/// topic with no payload yields an empty payload.
pub fn parse_line(line: &str) -> Option<InboundMessage> {
    parse_raw_line(line.as_bytes())
}

/// Byte-level [`parse_line`].  The payload is kept as raw bytes; a topic
/// that is not UTF-8 rejects the line.
pub fn parse_raw_line(line: &[u8]) -> Option<InboundMessage> {
    let end = line
        .iter()
        .rposition(|b| !matches!(b, b'\r' | b'\n'))
        .map_or(0, |i| i + 1);
    let line = &line[..end];
    let (topic, payload) = match line.iter().position(|b| *b == b' ') {
        Some(i) => (&line[..i], &line[i + 1..]),
        None => (line, &[][..]),
    };
    if topic.is_empty() {
        return None;
    }
    let Ok(topic) = std::str::from_utf8(topic) else {
        debug!("Skipping line with non-UTF-8 topic ({} bytes)", line.len());
        return None;
    };
    Some(InboundMessage::new(topic, payload))
}

/// Read lines until EOF (or the receiver hangs up), forwarding those whose
/// topic matches one of `filters`.  Returns the number forwarded.
///
/// Lines are read as bytes: undecodable input is skipped, never fatal.
pub fn read_lines<R: BufRead>(
    mut reader: R,
    filters: &[String],
    tx: &SyncSender<InboundMessage>,
) -> io::Result<u64> {
    let mut forwarded = 0;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let Some(msg) = parse_raw_line(&buf) else {
            continue;
        };
        if !filters.iter().any(|f| topic_matches(f, &msg.topic)) {
            trace!("Unsubscribed topic {}", msg.topic);
            continue;
        }
        if tx.send(msg).is_err() {
            debug!("Ingress queue closed; stopping reader");
            break;
        }
        forwarded += 1;
    }
    Ok(forwarded)
}

/// Publishes as `<topic> <payload>` lines on a writer.
pub struct LineBus<W: Write> {
    out: W,
    subscriptions: Vec<String>,
}

impl<W: Write> LineBus<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            subscriptions: Vec::new(),
        }
    }

    /// Topic filters registered so far, for the reader thread.
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> BusPort for LineBus<W> {
    fn subscribe(&mut self, topic: &str) -> Result<(), BusError> {
        if !self.subscriptions.iter().any(|t| t == topic) {
            self.subscriptions.push(topic.to_string());
        }
        Ok(())
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: u8,
        retain: bool,
    ) -> Result<(), BusError> {
        trace!("publish {topic} qos={qos} retain={retain}");
        let write = |out: &mut W| -> io::Result<()> {
            out.write_all(topic.as_bytes())?;
            out.write_all(b" ")?;
            out.write_all(payload)?;
            out.write_all(b"\n")?;
            out.flush()
        };
        write(&mut self.out).map_err(|e| BusError::PublishFailed(e.to_string()))
    }
}
