//! Versioned parameter state blob.
//!
//! The host stores this blob with its session and hands it back on reload.
//!
//! # Format
//!
//! ```text
//! magic    4 bytes   b"TSTG"
//! version  u16 LE    STATE_VERSION
//! count    u16 LE    number of entries
//! entry    [len: u8][identifier: utf8][value: f32 LE]   (count times)
//! ```
//!
//! Entries are keyed by string identifier rather than numeric ID so a blob
//! stays readable if parameters are added or reordered. Unknown identifiers
//! are skipped. Any structural problem rejects the whole blob before a
//! single parameter is touched.

use crate::error::StateError;
use crate::parameters::ParameterStore;
use crate::types::ParameterValue;

/// Leading bytes of every state blob.
pub const STATE_MAGIC: [u8; 4] = *b"TSTG";

/// Current state format version.
pub const STATE_VERSION: u16 = 1;

/// Serialize every exposed parameter.
pub fn save_state<P: ParameterStore + ?Sized>(params: &P) -> Vec<u8> {
    let count = params.count().min(u16::MAX as usize);
    let mut data = Vec::with_capacity(8 + count * 16);
    data.extend_from_slice(&STATE_MAGIC);
    data.extend_from_slice(&STATE_VERSION.to_le_bytes());
    data.extend_from_slice(&(count as u16).to_le_bytes());

    for parameter in (0..count).filter_map(|i| params.parameter(i)) {
        let identifier = parameter.info().identifier.as_bytes();
        data.push(identifier.len() as u8);
        data.extend_from_slice(identifier);
        data.extend_from_slice(&parameter.target().to_le_bytes());
    }

    log::debug!("saved {} parameters ({} bytes)", count, data.len());
    data
}

/// Restore parameters from a blob written by [`save_state`].
///
/// Returns the number of parameters applied. On error nothing is applied.
pub fn load_state<P: ParameterStore + ?Sized>(
    params: &P,
    data: &[u8],
) -> Result<usize, StateError> {
    let entries = match parse(data) {
        Ok(entries) => entries,
        Err(err) => {
            log::warn!("rejecting state blob: {}", err);
            return Err(err);
        }
    };

    let mut applied = 0;
    for (identifier, value) in entries {
        match params.by_identifier(identifier) {
            Some(parameter) => {
                parameter.set_target(value);
                applied += 1;
            }
            None => log::debug!("skipping unknown parameter '{}'", identifier),
        }
    }
    log::debug!("restored {} parameters", applied);
    Ok(applied)
}

fn parse(data: &[u8]) -> Result<Vec<(&str, ParameterValue)>, StateError> {
    if data.is_empty() {
        return Err(StateError::Empty);
    }
    let mut reader = Reader { data, offset: 0 };

    if reader.bytes(STATE_MAGIC.len()).ok() != Some(&STATE_MAGIC[..]) {
        return Err(StateError::BadMagic);
    }
    let version = reader.u16()?;
    if version == 0 || version > STATE_VERSION {
        return Err(StateError::UnsupportedVersion(version));
    }

    let count = reader.u16()? as usize;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let len = reader.u8()? as usize;
        let start = reader.offset;
        let identifier = std::str::from_utf8(reader.bytes(len)?)
            .map_err(|_| StateError::InvalidIdentifier { offset: start })?;
        let value = f32::from_le_bytes(reader.array()?);
        entries.push((identifier, value));
    }
    Ok(entries)
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn bytes(&mut self, len: usize) -> Result<&'a [u8], StateError> {
        let end = self.offset + len;
        let slice = self
            .data
            .get(self.offset..end)
            .ok_or(StateError::Truncated { offset: self.offset })?;
        self.offset = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], StateError> {
        let offset = self.offset;
        self.bytes(N)?
            .try_into()
            .map_err(|_| StateError::Truncated { offset })
    }

    fn u8(&mut self) -> Result<u8, StateError> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, StateError> {
        Ok(u16::from_le_bytes(self.array()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageLayout;
    use crate::parameters::GainStageParameters;

    #[test]
    fn round_trip_restores_targets() {
        let source = GainStageParameters::new(StageLayout::TrimAndOutput, true);
        source.in_trim.set_target(0.37);
        source.out_vol.set_target(0.81);
        source.bypass.set_target(1.0);
        source.midi_channel.set_target(0.25);
        let blob = save_state(&source);

        let restored = GainStageParameters::new(StageLayout::TrimAndOutput, true);
        assert_eq!(load_state(&restored, &blob), Ok(4));
        assert_eq!(restored.in_trim.target(), source.in_trim.target());
        assert_eq!(restored.out_vol.target(), source.out_vol.target());
        assert!(restored.bypass.is_on());
        assert_eq!(restored.channel_filter(), Some(4));
    }

    #[test]
    fn rejects_malformed_blobs_without_applying() {
        let params = GainStageParameters::default();
        params.gain.set_target(0.3);
        let mut blob = save_state(&params);

        let fresh = GainStageParameters::default();
        assert_eq!(load_state(&fresh, &[]), Err(StateError::Empty));
        assert_eq!(load_state(&fresh, b"XXXX\x01\x00"), Err(StateError::BadMagic));

        let mut future = blob.clone();
        future[4] = 9;
        assert_eq!(load_state(&fresh, &future), Err(StateError::UnsupportedVersion(9)));

        blob.truncate(blob.len() - 2);
        assert!(matches!(
            load_state(&fresh, &blob),
            Err(StateError::Truncated { .. })
        ));
        assert_eq!(fresh.gain.target(), 0.5);
    }

    #[test]
    fn invalid_identifier_is_rejected() {
        let mut blob = Vec::new();
        blob.extend_from_slice(&STATE_MAGIC);
        blob.extend_from_slice(&STATE_VERSION.to_le_bytes());
        blob.extend_from_slice(&1u16.to_le_bytes());
        blob.push(2);
        blob.extend_from_slice(&[0xFF, 0xFE]);
        blob.extend_from_slice(&0.5f32.to_le_bytes());

        let params = GainStageParameters::default();
        assert_eq!(
            load_state(&params, &blob),
            Err(StateError::InvalidIdentifier { offset: 9 })
        );
    }

    #[test]
    fn unknown_identifiers_are_skipped() {
        let trim = GainStageParameters::new(StageLayout::TrimAndOutput, false);
        trim.out_vol.set_target(0.2);
        let blob = save_state(&trim);

        let single = GainStageParameters::new(StageLayout::SingleGain, false);
        // bypass is shared, inTrim/outVol are not exposed by a single-gain set
        assert_eq!(load_state(&single, &blob), Ok(1));
        assert_eq!(single.gain.target(), 0.5);
    }

    #[test]
    fn restored_values_are_quantized() {
        let mut blob = Vec::new();
        blob.extend_from_slice(&STATE_MAGIC);
        blob.extend_from_slice(&STATE_VERSION.to_le_bytes());
        blob.extend_from_slice(&1u16.to_le_bytes());
        blob.push(4);
        blob.extend_from_slice(b"gain");
        blob.extend_from_slice(&7.5f32.to_le_bytes());

        let params = GainStageParameters::default();
        assert_eq!(load_state(&params, &blob), Ok(1));
        assert_eq!(params.gain.target(), 1.0);
    }
}
