//! Common types used throughout trimstage.

/// Maximum number of audio channels in a [`Buffer`](crate::Buffer).
///
/// Bus negotiation only accepts mono and stereo, but the buffer tolerates
/// hosts that hand over extra output-only channels. Anything beyond this
/// count is ignored.
pub const MAX_CHANNELS: usize = 8;

/// Parameter identifier, derived from the string identifier with
/// [`fnv1a_32`](trimstage_utils::fnv1a_32).
pub type ParameterId = u32;

/// Normalized parameter value (0.0 to 1.0).
pub type ParameterValue = f32;
