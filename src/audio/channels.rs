use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Number of microphones, which is also the size of one interleaved sample group.
pub const CHANNEL_COUNT: usize = 4;

/// One of the four fixed microphones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Right,
    Left,
    Back,
    Front,
}

impl Channel {
    /// All channels in wire order, `[right, left, back, front]`.
    pub const ALL: [Channel; CHANNEL_COUNT] =
        [Channel::Right, Channel::Left, Channel::Back, Channel::Front];

    /// Position of this microphone inside each interleaved group of four samples.
    /// Also used as the storage index in [`ChannelBuffers`].
    pub fn wire_offset(self) -> usize {
        match self {
            Channel::Right => 0,
            Channel::Left => 1,
            Channel::Back => 2,
            Channel::Front => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Right => "right",
            Channel::Left => "left",
            Channel::Back => "back",
            Channel::Front => "front",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "right" => Ok(Channel::Right),
            "left" => Ok(Channel::Left),
            "back" => Ok(Channel::Back),
            "front" => Ok(Channel::Front),
            other => Err(format!("unknown channel '{}' (expected front, back, left or right)", other)),
        }
    }
}

/// Identifies one of the eight buffers exposed by the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferId {
    /// Interleaved complex input (`2N` values) of a channel.
    ComplexInput(Channel),
    /// Magnitude spectrum (`N` values) of a channel.
    Magnitude(Channel),
}

impl BufferId {
    /// Every identifier, ordered by its numeric code.
    pub const ALL: [BufferId; 2 * CHANNEL_COUNT] = [
        BufferId::ComplexInput(Channel::Left),
        BufferId::ComplexInput(Channel::Right),
        BufferId::ComplexInput(Channel::Front),
        BufferId::ComplexInput(Channel::Back),
        BufferId::Magnitude(Channel::Left),
        BufferId::Magnitude(Channel::Right),
        BufferId::Magnitude(Channel::Front),
        BufferId::Magnitude(Channel::Back),
    ];

    /// Numeric code used by telemetry peers that address buffers by index.
    pub fn code(self) -> u8 {
        Self::ALL
            .iter()
            .position(|&id| id == self)
            .map_or(u8::MAX, |i| i as u8)
    }

    pub fn name(self) -> String {
        match self {
            BufferId::ComplexInput(ch) => format!("{}_cmplx_input", ch),
            BufferId::Magnitude(ch) => format!("{}_output", ch),
        }
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl TryFrom<u8> for BufferId {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| Error::UnknownBuffer(code.to_string()))
    }
}

impl FromStr for BufferId {
    type Err = Error;

    /// Accepts either a buffer name or its numeric code.
    fn from_str(s: &str) -> Result<Self> {
        if let Ok(code) = s.parse::<u8>() {
            return Self::try_from(code);
        }
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.name() == lower)
            .ok_or_else(|| Error::UnknownBuffer(s.to_string()))
    }
}

/// The per-channel complex input and magnitude buffers.
///
/// Complex buffers hold `2N` floats interleaved as `(re0, im0, re1, im1, ...)`,
/// magnitude buffers hold `N` floats. All buffers are allocated once and then
/// overwritten in place every frame.
pub struct ChannelBuffers {
    fft_size: usize,
    complex: [Vec<f32>; CHANNEL_COUNT],
    magnitude: [Vec<f32>; CHANNEL_COUNT],
}

impl ChannelBuffers {
    pub fn new(fft_size: usize) -> Self {
        Self {
            fft_size,
            complex: std::array::from_fn(|_| vec![0.0; 2 * fft_size]),
            magnitude: std::array::from_fn(|_| vec![0.0; fft_size]),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Length of every complex buffer, in floats.
    pub fn complex_len(&self) -> usize {
        2 * self.fft_size
    }

    /// Writes one interleaved group `[right, left, back, front]` as complex sample
    /// number `slot / 2`; the imaginary part is zeroed.
    pub fn write_group(&mut self, slot: usize, group: &[i16]) {
        debug_assert_eq!(group.len(), CHANNEL_COUNT);
        debug_assert!(slot + 1 < self.complex_len());
        for ch in Channel::ALL {
            let buf = &mut self.complex[ch.wire_offset()];
            buf[slot] = f32::from(group[ch.wire_offset()]);
            buf[slot + 1] = 0.0;
        }
    }

    pub fn complex(&self, ch: Channel) -> &[f32] {
        &self.complex[ch.wire_offset()]
    }

    pub fn magnitude(&self, ch: Channel) -> &[f32] {
        &self.magnitude[ch.wire_offset()]
    }

    pub fn get(&self, id: BufferId) -> &[f32] {
        match id {
            BufferId::ComplexInput(ch) => self.complex(ch),
            BufferId::Magnitude(ch) => self.magnitude(ch),
        }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn get_mut(&mut self, id: BufferId) -> &mut [f32] {
        match id {
            BufferId::ComplexInput(ch) => &mut self.complex[ch.wire_offset()],
            BufferId::Magnitude(ch) => &mut self.magnitude[ch.wire_offset()],
        }
    }

    /// Mutable (complex, magnitude) pairs for every channel, in wire order.
    pub fn pairs_mut(&mut self) -> impl Iterator<Item = (Channel, &mut [f32], &mut [f32])> {
        Channel::ALL
            .into_iter()
            .zip(self.complex.iter_mut().zip(self.magnitude.iter_mut()))
            .map(|(ch, (c, m))| (ch, c.as_mut_slice(), m.as_mut_slice()))
    }
}
