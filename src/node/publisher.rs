//! Status message serialization and transmission.

use core::fmt::Write as _;

use heapless::String;

use crate::net::BrokerSession;
use crate::net::error::Error;
use crate::sensor::SampleSet;

/// Capacity of the rendered status message.
///
/// Six channels with 20-character names and 4-character values fit with
/// room to spare.
pub const MAX_MESSAGE_LEN: usize = 256;

/// Render a sample set as the flat JSON status object.
///
/// Keys appear in sampling order: the built-ins first, then the enabled
/// switch channels by channel index. Channels that were not sampled this
/// pass (disabled bindings) are absent entirely, not null.
///
/// # Errors
///
/// [`Error::ProtocolError`] if the rendered message exceeds
/// [`MAX_MESSAGE_LEN`].
pub fn render_status(samples: &SampleSet) -> Result<String<MAX_MESSAGE_LEN>, Error> {
    let mut out: String<MAX_MESSAGE_LEN> = String::new();
    out.push('{').map_err(|_| Error::ProtocolError)?;
    for (i, (name, value)) in samples.iter().enumerate() {
        if i > 0 {
            out.push(',').map_err(|_| Error::ProtocolError)?;
        }
        write!(out, "\"{name}\":{value}").map_err(|_| Error::ProtocolError)?;
    }
    out.push('}').map_err(|_| Error::ProtocolError)?;
    Ok(out)
}

/// Serialize a sample set and publish it retained on the configured topic.
///
/// One transmission attempt, no internal retry: a failure is reported
/// upward so the connectivity manager can decide whether the session itself
/// needs rebuilding.
pub fn publish_status<S: BrokerSession>(
    session: &mut S,
    topic: &str,
    samples: &SampleSet,
) -> Result<(), Error> {
    let message = render_status(samples)?;
    session.publish(topic, message.as_bytes(), true)
}
