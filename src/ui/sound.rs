/// Sound engine: procedural 8-bit style sound effects via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    const SAMPLE_RATE: u32 = 22050;

    /// Pre-generated WAV buffers for each sound effect.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_clue: Arc<Vec<u8>>,
        sfx_expose: Arc<Vec<u8>>,
        sfx_reject: Arc<Vec<u8>>,
        sfx_caught: Arc<Vec<u8>>,
        sfx_win: Arc<Vec<u8>>,
        sfx_lose: Arc<Vec<u8>>,
        sfx_round: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = OutputStream::try_default().ok()?;

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_clue: Arc::new(make_wav(&gen_clue())),
                sfx_expose: Arc::new(make_wav(&gen_expose())),
                sfx_reject: Arc::new(make_wav(&gen_reject())),
                sfx_caught: Arc::new(make_wav(&gen_caught())),
                sfx_win: Arc::new(make_wav(&gen_win())),
                sfx_lose: Arc::new(make_wav(&gen_lose())),
                sfx_round: Arc::new(make_wav(&gen_round())),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn play_clue(&self) {
            self.play(&self.sfx_clue);
        }
        pub fn play_expose(&self) {
            self.play(&self.sfx_expose);
        }
        pub fn play_reject(&self) {
            self.play(&self.sfx_reject);
        }
        pub fn play_caught(&self) {
            self.play(&self.sfx_caught);
        }
        pub fn play_win(&self) {
            self.play(&self.sfx_win);
        }
        pub fn play_lose(&self) {
            self.play(&self.sfx_lose);
        }
        pub fn play_round(&self) {
            self.play(&self.sfx_round);
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators — all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn tone(samples: &mut Vec<f32>, freq: f32, dur: f32, volume: f32) {
        let n = (SAMPLE_RATE as f32 * dur) as usize;
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32).powf(0.5);
            // Square-ish wave (sine + 3rd harmonic) for retro feel
            let wave = (t * freq * 2.0 * std::f32::consts::PI).sin() * 0.7
                + (t * freq * 3.0 * 2.0 * std::f32::consts::PI).sin() * 0.3;
            samples.push(wave * env * volume);
        }
    }

    /// Clue pickup: short high two-note blip
    fn gen_clue() -> Vec<f32> {
        let mut samples = Vec::new();
        tone(&mut samples, 1319.0, 0.04, 0.22); // E6
        tone(&mut samples, 1760.0, 0.05, 0.22); // A6
        samples
    }

    /// Front exposed: ascending four-note chime
    fn gen_expose() -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in &[523.0_f32, 659.0, 784.0, 1047.0] {
            // C5 E5 G5 C6
            tone(&mut samples, freq, 0.07, 0.28);
        }
        samples
    }

    /// Rejected accusation: low buzz, tone mixed with noise
    fn gen_reject() -> Vec<f32> {
        let duration = 0.18;
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut rng: u32 = 98765;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let buzz = (ti * 110.0 * 2.0 * std::f32::consts::PI).sin() * 0.6
                    + (ti * 147.0 * 2.0 * std::f32::consts::PI).sin() * 0.4;
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let env = (1.0 - t).powf(0.4);
                (buzz * 0.8 + noise * 0.2) * env * 0.3
            })
            .collect()
    }

    /// Caught by a patrol: sharp descending sting
    fn gen_caught() -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in &[880.0_f32, 659.0, 440.0, 330.0] {
            tone(&mut samples, freq, 0.06, 0.3);
        }
        samples
    }

    /// Round won: victory fanfare with a sustained last note
    fn gen_win() -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in &[523.0_f32, 659.0, 784.0, 659.0, 784.0] {
            tone(&mut samples, freq, 0.09, 0.3);
        }
        let last = 1047.0_f32;
        let n = (SAMPLE_RATE as f32 * 0.3) as usize;
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - i as f32 / n as f32;
            let wave = (t * last * 2.0 * std::f32::consts::PI).sin();
            samples.push(wave * env * 0.3);
        }
        samples
    }

    /// Round lost: slow descending minor dirge
    fn gen_lose() -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in &[440.0_f32, 415.0, 349.0, 220.0] {
            // A4 Ab4 F4 A3
            tone(&mut samples, freq, 0.16, 0.28);
        }
        // Final fade
        let fade_len = samples.len() / 4;
        let total = samples.len();
        for i in (total - fade_len)..total {
            let ratio = (total - i) as f32 / fade_len as f32;
            samples[i] *= ratio;
        }
        samples
    }

    /// New round: brisk two-note announce
    fn gen_round() -> Vec<f32> {
        let mut samples = Vec::new();
        tone(&mut samples, 784.0, 0.08, 0.26); // G5
        tone(&mut samples, 1175.0, 0.14, 0.26); // D6
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder — wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let clamped = s.max(-1.0).min(1.0);
            let val = (clamped * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }
}

// ════════════════════════════════════════════════════════════
//  Public API — compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> {
        Some(SoundEngine)
    }
    pub fn play_clue(&self) {}
    pub fn play_expose(&self) {}
    pub fn play_reject(&self) {}
    pub fn play_caught(&self) {}
    pub fn play_win(&self) {}
    pub fn play_lose(&self) {}
    pub fn play_round(&self) {}
}
