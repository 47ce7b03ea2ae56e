//! MIDI event types for the audio thread.
//!
//! Every event is `Copy` and the [`MidiBuffer`] has fixed capacity, so
//! events can be collected and scanned inside the audio callback without
//! touching the heap. The gain stage only reacts to control changes; the
//! other channel-voice messages are decoded so a host can pass its whole
//! input stream through.

// =============================================================================
// Basic MIDI Types
// =============================================================================

/// MIDI channel (0-15). The control surface shows these as 1-16.
pub type MidiChannel = u8;

/// A MIDI note-on event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteOn {
    /// MIDI channel (0-15).
    pub channel: MidiChannel,
    /// Note number (0-127).
    pub pitch: u8,
    /// Velocity (0.0 to 1.0).
    pub velocity: f32,
}

/// A MIDI note-off event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteOff {
    /// MIDI channel (0-15).
    pub channel: MidiChannel,
    /// Note number (0-127).
    pub pitch: u8,
    /// Release velocity (0.0 to 1.0).
    pub velocity: f32,
}

/// Control Change (CC) message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlChange {
    /// MIDI channel (0-15).
    pub channel: MidiChannel,
    /// Controller number (0-127).
    pub controller: u8,
    /// Controller value (0.0 to 1.0, normalized from 0-127).
    pub value: f32,
}

impl ControlChange {
    /// Build from a raw 7-bit controller value.
    #[inline]
    pub fn from_raw(channel: MidiChannel, controller: u8, value: u8) -> Self {
        Self {
            channel: channel & 0x0F,
            controller: controller & 0x7F,
            value: (value & 0x7F) as f32 / 127.0,
        }
    }

    /// The value as a raw 7-bit number.
    #[inline]
    pub fn raw_value(&self) -> u8 {
        (self.value.clamp(0.0, 1.0) * 127.0).round() as u8
    }
}

/// Pitch bend message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchBend {
    /// MIDI channel (0-15).
    pub channel: MidiChannel,
    /// Bend amount (-1.0 to 1.0, 0.0 = center).
    pub value: f32,
}

/// Program change message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgramChange {
    /// MIDI channel (0-15).
    pub channel: MidiChannel,
    /// Program number (0-127).
    pub program: u8,
}

/// Common controller numbers.
pub mod cc {
    /// Modulation wheel.
    pub const MOD_WHEEL: u8 = 1;
    /// Channel volume.
    pub const VOLUME: u8 = 7;
    /// Expression pedal.
    pub const EXPRESSION: u8 = 11;
}

// =============================================================================
// MIDI Event
// =============================================================================

/// MIDI event types.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MidiEventKind {
    /// Note on event.
    NoteOn(NoteOn),
    /// Note off event.
    NoteOff(NoteOff),
    /// Control change (CC).
    ControlChange(ControlChange),
    /// Pitch bend.
    PitchBend(PitchBend),
    /// Program change.
    ProgramChange(ProgramChange),
}

/// A sample-accurate MIDI event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiEvent {
    /// Sample offset within the current block (0 = start of block).
    pub sample_offset: u32,
    /// The MIDI event data.
    pub event: MidiEventKind,
}

impl Default for MidiEvent {
    /// Zeroed note-off, used to fill the buffer storage.
    fn default() -> Self {
        Self {
            sample_offset: 0,
            event: MidiEventKind::NoteOff(NoteOff {
                channel: 0,
                pitch: 0,
                velocity: 0.0,
            }),
        }
    }
}

impl MidiEvent {
    /// Create a control change event from normalized data.
    pub const fn control_change(
        sample_offset: u32,
        channel: MidiChannel,
        controller: u8,
        value: f32,
    ) -> Self {
        Self {
            sample_offset,
            event: MidiEventKind::ControlChange(ControlChange {
                channel,
                controller,
                value,
            }),
        }
    }

    /// Decode a MIDI 1.0 channel-voice message.
    ///
    /// Returns `None` for system messages, running status, and truncated
    /// input. A note-on with velocity 0 decodes as a note-off.
    pub fn from_bytes(sample_offset: u32, bytes: &[u8]) -> Option<Self> {
        let status = *bytes.first()?;
        if status < 0x80 || status >= 0xF0 {
            return None;
        }
        let channel = status & 0x0F;
        let data = |i: usize| bytes.get(i).map(|b| b & 0x7F);

        let event = match status & 0xF0 {
            0x80 => MidiEventKind::NoteOff(NoteOff {
                channel,
                pitch: data(1)?,
                velocity: data(2)? as f32 / 127.0,
            }),
            0x90 => {
                let pitch = data(1)?;
                let velocity = data(2)?;
                if velocity == 0 {
                    MidiEventKind::NoteOff(NoteOff {
                        channel,
                        pitch,
                        velocity: 0.0,
                    })
                } else {
                    MidiEventKind::NoteOn(NoteOn {
                        channel,
                        pitch,
                        velocity: velocity as f32 / 127.0,
                    })
                }
            }
            0xB0 => MidiEventKind::ControlChange(ControlChange::from_raw(
                channel,
                data(1)?,
                data(2)?,
            )),
            0xC0 => MidiEventKind::ProgramChange(ProgramChange {
                channel,
                program: data(1)?,
            }),
            0xE0 => {
                let raw = ((data(2)? as u16) << 7) | data(1)? as u16;
                MidiEventKind::PitchBend(PitchBend {
                    channel,
                    value: (raw as f32 - 8192.0) / 8192.0,
                })
            }
            // Poly and channel pressure are not used by the gain stage
            _ => return None,
        };

        Some(Self {
            sample_offset,
            event,
        })
    }
}

// =============================================================================
// MIDI Buffer
// =============================================================================

/// Maximum number of MIDI events per block.
pub const MAX_MIDI_EVENTS: usize = 1024;

/// A buffer for collecting MIDI events during processing.
///
/// Uses a fixed-size array to avoid heap allocation during processing.
/// Events should be added in chronological order (by sample_offset).
#[derive(Debug)]
pub struct MidiBuffer {
    events: [MidiEvent; MAX_MIDI_EVENTS],
    len: usize,
    /// Set to true when a push fails due to buffer exhaustion
    overflowed: bool,
}

impl MidiBuffer {
    /// Create a new empty MIDI buffer.
    pub fn new() -> Self {
        Self {
            events: [MidiEvent::default(); MAX_MIDI_EVENTS],
            len: 0,
            overflowed: false,
        }
    }

    /// Clear all events from the buffer.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
        self.overflowed = false;
    }

    /// Returns the number of events in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if any push failed since the last clear.
    #[inline]
    pub fn has_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Push an event to the buffer.
    ///
    /// Returns `true` if the event was added, `false` if the buffer is full.
    #[inline]
    pub fn push(&mut self, event: MidiEvent) -> bool {
        if self.len < MAX_MIDI_EVENTS {
            self.events[self.len] = event;
            self.len += 1;
            true
        } else {
            self.overflowed = true;
            false
        }
    }

    /// Iterate over events in the buffer.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &MidiEvent> {
        self.events[..self.len].iter()
    }
}

impl Default for MidiBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_control_change() {
        let event = MidiEvent::from_bytes(12, &[0xB3, 7, 127]).unwrap();
        assert_eq!(event.sample_offset, 12);
        match event.event {
            MidiEventKind::ControlChange(change) => {
                assert_eq!(change.channel, 3);
                assert_eq!(change.controller, cc::VOLUME);
                assert_eq!(change.value, 1.0);
                assert_eq!(change.raw_value(), 127);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn zero_velocity_note_on_is_note_off() {
        let event = MidiEvent::from_bytes(0, &[0x90, 60, 0]).unwrap();
        assert!(matches!(event.event, MidiEventKind::NoteOff(_)));
    }

    #[test]
    fn pitch_bend_center_is_zero() {
        let event = MidiEvent::from_bytes(0, &[0xE0, 0x00, 0x40]).unwrap();
        match event.event {
            MidiEventKind::PitchBend(pb) => assert_eq!(pb.value, 0.0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_system_and_truncated_messages() {
        assert!(MidiEvent::from_bytes(0, &[]).is_none());
        assert!(MidiEvent::from_bytes(0, &[0xF8]).is_none());
        assert!(MidiEvent::from_bytes(0, &[0x40, 0x10]).is_none());
        assert!(MidiEvent::from_bytes(0, &[0xB0, 7]).is_none());
    }

    #[test]
    fn buffer_reports_overflow() {
        let mut buffer = MidiBuffer::new();
        for i in 0..MAX_MIDI_EVENTS {
            assert!(buffer.push(MidiEvent::control_change(i as u32, 0, 7, 0.5)));
        }
        assert!(!buffer.push(MidiEvent::control_change(0, 0, 7, 0.5)));
        assert!(buffer.has_overflowed());
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(!buffer.has_overflowed());
    }
}
