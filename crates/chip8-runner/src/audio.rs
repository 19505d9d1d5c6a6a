//! Beep playback.
//!
//! The CHIP-8 sound device is a single fixed tone: when the sound timer
//! crosses to zero the machine beeps once. We keep a cpal output stream
//! alive for the whole run and push a short square-wave clip into its
//! ring buffer whenever the VM fires the trigger.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use ringbuf::{
    HeapRb,
    traits::{Consumer, Producer, Split},
};

/// Output sample rate in Hz.
const SAMPLE_RATE: u32 = 44_100;

/// Beep pitch in Hz.
const BEEP_HZ: u32 = 440;

/// Beep clip length.
const BEEP_MS: u32 = 150;

/// Square wave amplitude.
const AMPLITUDE: f32 = 0.25;

/// Audio output handler that manages the cpal stream and ring buffer.
pub struct AudioOutput {
    _stream: Stream,
    producer: ringbuf::HeapProd<f32>,
}

impl AudioOutput {
    /// Create the output stream.
    ///
    /// Returns None if no audio device is available; the run continues
    /// silently in that case.
    pub fn new() -> Option<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device()?;

        let config = StreamConfig {
            channels: 1,
            sample_rate: SampleRate(SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        // Ring buffer holds two full clips; a beep arriving while one is
        // still draining is simply cut short
        let clip_len = (SAMPLE_RATE * BEEP_MS / 1000) as usize;
        let ring = HeapRb::<f32>::new(clip_len * 2);
        let (producer, mut consumer) = ring.split();

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for sample in data.iter_mut() {
                        // Silence on underrun: the pad only sounds while a
                        // clip is queued
                        *sample = consumer.try_pop().unwrap_or(0.0);
                    }
                },
                |err| eprintln!("Audio stream error: {err}"),
                None,
            )
            .ok()?;

        stream.play().ok()?;

        Some(Self {
            _stream: stream,
            producer,
        })
    }

    /// Queue one beep clip.
    pub fn beep(&mut self) {
        let clip_len = (SAMPLE_RATE * BEEP_MS / 1000) as usize;
        let half_period = (SAMPLE_RATE / (2 * BEEP_HZ)) as usize;

        for n in 0..clip_len {
            let sample = if (n / half_period) % 2 == 0 {
                AMPLITUDE
            } else {
                -AMPLITUDE
            };
            if self.producer.try_push(sample).is_err() {
                break;
            }
        }
    }
}
