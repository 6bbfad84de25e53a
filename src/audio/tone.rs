use super::channels::{Channel, CHANNEL_COUNT};

/// Interleaved `[right, left, back, front]` samples carrying a cosine on one
/// channel and silence on the others.
///
/// The cosine completes `bin` periods every `fft_size` samples, so it lands
/// exactly on magnitude bin `bin` (and its mirror `fft_size - bin`).
pub fn interleaved_tone(
    channel: Channel,
    bin: usize,
    amplitude: f32,
    fft_size: usize,
    samples_per_channel: usize,
) -> Vec<i16> {
    let mut out = vec![0i16; samples_per_channel * CHANNEL_COUNT];
    let step = 2.0 * std::f32::consts::PI * bin as f32 / fft_size as f32;
    for (k, group) in out.chunks_exact_mut(CHANNEL_COUNT).enumerate() {
        let phase = step * (k % fft_size) as f32;
        let value = (amplitude * phase.cos()).round();
        group[channel.wire_offset()] = value.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16;
    }
    out
}
